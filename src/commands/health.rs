use crate::guard::GuardState;
use crate::state::ClientRuntime;
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Instant;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_ms: u128,
    pub db: &'static str,
    pub session: &'static str,
    pub guard: GuardState,
}

pub async fn probe_db(pool: &SqlitePool) -> &'static str {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
    {
        Ok(_) => "ok",
        Err(_) => "error",
    }
}

pub async fn health(state: &ClientRuntime) -> HealthResponse {
    let session = state.auth.local().current().status.as_str();

    HealthResponse {
        status: "ok",
        uptime_ms: elapsed_ms(state.started_at),
        db: probe_db(&state.db_pool).await,
        session,
        guard: state.guard.state(),
    }
}

fn elapsed_ms(started_at: Instant) -> u128 {
    started_at.elapsed().as_millis()
}
