use crate::api::domain::response::ConnectionSummary;
use crate::appstate::appstate::AppState;
use crate::ftp::SessionFactory;
use actix_web::{HttpResponse, Responder, web};

pub async fn get_connection(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ConnectionSummary::from(state.descriptor.as_ref()))
}

pub async fn check_connection(state: web::Data<AppState>) -> impl Responder {
    let mut session = match state.pool.get().await {
        Ok(session) => session,
        Err(e) => {
            log::error!("ftp connection check failed: {e}");
            return HttpResponse::BadGateway().json(serde_json::json!({ "error": e.to_string() }));
        }
    };

    match session.noop_within(state.pool.factory().reply_timeout()).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })),
        Err(e) => {
            log::error!("ftp NOOP failed: {e}");
            session.discard();
            HttpResponse::BadGateway().json(serde_json::json!({ "error": e.to_string() }))
        }
    }
}
