use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1_routes())
}

fn v1_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/repairs", repair_routes())
        .nest("/customers", customer_routes())
        .nest("/technicians", technician_routes())
        .nest("/admins", admin_routes())
        .nest("/donations", donation_routes())
        .nest("/public", public_routes())
        .nest("/live", live_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::auth::change_password))
        .routes(routes!(handlers::auth::redeem_onboarding))
}

fn repair_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::repair::list_repairs,
            handlers::repair::create_repair
        ))
        .routes(routes!(handlers::repair::list_archive))
        .routes(routes!(
            handlers::repair::get_repair,
            handlers::repair::delete_repair
        ))
        .routes(routes!(handlers::repair::update_status))
        .routes(routes!(handlers::repair::assign_technician))
        .routes(routes!(handlers::repair::clone_repair))
        .routes(routes!(handlers::repair::repair_qr))
}

fn customer_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::customer::list_customers,
            handlers::customer::create_customer
        ))
        .routes(routes!(handlers::customer::bulk_delete_customers))
        .routes(routes!(handlers::customer::import_customers))
        .routes(routes!(
            handlers::customer::get_customer,
            handlers::customer::update_customer,
            handlers::customer::delete_customer
        ))
        .routes(routes!(handlers::customer::customer_qr))
}

fn technician_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::technician::list_technicians,
            handlers::technician::create_technician
        ))
        .routes(routes!(handlers::technician::import_technicians))
        .routes(routes!(
            handlers::technician::update_technician,
            handlers::technician::delete_technician
        ))
        .routes(routes!(handlers::technician::reset_technician_password))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::admin::list_admins,
            handlers::admin::create_admin
        ))
        .routes(routes!(
            handlers::admin::update_admin,
            handlers::admin::delete_admin
        ))
        .routes(routes!(handlers::admin::reset_admin_password))
}

fn donation_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::donation::list_donations,
        handlers::donation::create_donation
    ))
}

fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::public::get_public_repair))
}

fn live_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::live::subscribe))
}
