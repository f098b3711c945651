use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/accounts", account_routes())
        .nest("/maintenance", maintenance_routes())
}

fn account_routes() -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            handlers::account::list_accounts,
            handlers::account::create_account
        ))
        .routes(routes!(
            handlers::account::get_account,
            handlers::account::update_account,
            handlers::account::delete_account
        ))
        .routes(routes!(
            handlers::file::view_file,
            handlers::file::detach_file
        ))
        .layer(handlers::account::upload_body_limit());

    let tools = OpenApiRouter::new().routes(routes!(handlers::account::generate_password));

    crud.merge(tools)
}

fn maintenance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::maintenance::sweep_objects))
        .routes(routes!(handlers::maintenance::sweep_legacy))
}
