mod audit;
mod config;
mod db;
mod error;
mod files;
mod gateway;
mod handlers;
mod history;
mod models;
mod permissions;
mod plans;
mod profiles;
mod quizzes;

use axum::{
    routing::{delete, get, post},
    Router,
};
use handlers::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("failed to build log filter");
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::from_env();
    let conn = db::establish_connection(&config.database_path)
        .expect("Failed to establish database connection");
    std::fs::create_dir_all(config.media_dir.join("profile_images"))
        .expect("Failed to create media directory");

    let state = AppState {
        db: conn,
        gateway: Arc::new(gateway::OpenAiGateway::new(&config.generation)),
        media_dir: config.media_dir.clone(),
    };

    let app = Router::new()
        .route(
            "/generate-custom-curriculum",
            post(handlers::generation::generate_custom_curriculum),
        )
        .route(
            "/generate-standard-curriculum",
            post(handlers::generation::generate_standard_curriculum),
        )
        .route(
            "/get-user-curriculums/:uid",
            get(handlers::generation::get_user_curriculums),
        )
        .route(
            "/generate-lesson-plan",
            post(handlers::generation::generate_lesson_plan),
        )
        .route(
            "/get-user-lesson-plans/:uid",
            get(handlers::generation::get_user_lesson_plans),
        )
        .route("/get-profile/:uid", get(handlers::profiles::get_profile))
        .route("/save-profile", post(handlers::profiles::save_profile))
        .route(
            "/quizzes",
            get(handlers::quizzes::list_quizzes).post(handlers::quizzes::create_quiz),
        )
        .route(
            "/quizzes/:quiz_id",
            get(handlers::quizzes::get_quiz).put(handlers::quizzes::update_quiz),
        )
        .route(
            "/files",
            get(handlers::files::list_files).post(handlers::files::create_file),
        )
        .route(
            "/files/:file_id",
            get(handlers::files::get_file).put(handlers::files::update_file),
        )
        .route("/files/:file_id/delete", delete(handlers::files::delete_file))
        .route(
            "/files/:file_id/permissions",
            post(handlers::files::update_permissions),
        )
        .route(
            "/files/:file_id/share",
            post(handlers::files::generate_share_link),
        )
        .route(
            "/files/:file_id/share/:link_id/access",
            post(handlers::files::access_share_link),
        )
        .route("/files/:file_id/rollback", post(handlers::files::rollback_file))
        .route(
            "/media/profile_images/:file_name",
            get(handlers::media::serve_profile_image),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .expect("Failed to bind server address");
    tracing::info!(addr = %config.bind_addr, "server running");
    axum::serve(listener, app).await.expect("Server error");
}
