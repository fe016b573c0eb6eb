use crate::appstate::appstate::AppState;
use crate::error::DepositBoxError;
use crate::inspect::{FtpDepositBox, inspect_all_users};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;

pub async fn list_box(state: web::Data<AppState>, path: web::Path<u32>) -> impl Responder {
    let ftp_box = path.into_inner();
    let ftp_dir = state.ftp_dir.clone();
    let result = web::block(move || inspect_all_users(&ftp_dir, ftp_box)).await;
    respond(result)
}

pub async fn user_report(
    state: web::Data<AppState>,
    path: web::Path<(u32, String)>,
) -> impl Responder {
    let (ftp_box, username) = path.into_inner();
    if username.contains(['/', '\\']) || username == ".." || username == "." {
        return HttpResponse::BadRequest().json(serde_json::json!({ "error": "invalid username" }));
    }
    let ftp_dir = state.ftp_dir.clone();
    let result = web::block(move || {
        FtpDepositBox::open(&ftp_dir, ftp_box, &username).map(|b| b.report())
    })
    .await;
    respond(result)
}

fn respond<T: Serialize>(
    result: Result<Result<T, DepositBoxError>, actix_web::error::BlockingError>,
) -> HttpResponse {
    match result {
        Ok(Ok(body)) => HttpResponse::Ok().json(body),
        Ok(Err(e @ (DepositBoxError::BoxNotFound { .. } | DepositBoxError::UserNotFound { .. }))) => {
            log::info!("{e}");
            HttpResponse::NotFound().json(serde_json::json!({ "error": e.to_string() }))
        }
        Ok(Err(e)) => {
            log::error!("deposit box inspection failed: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() }))
        }
        Err(e) => HttpResponse::InternalServerError()
            .json(serde_json::json!({ "error": format!("thread pool error: {e}") })),
    }
}
