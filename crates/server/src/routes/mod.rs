use axum::Router;

use crate::AppState;

pub mod chest;
pub mod fields;
pub mod health;
pub mod loot;
pub mod projects;
pub mod quests;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(chest::router())
        .merge(fields::router())
        .merge(loot::router())
        .merge(quests::router())
        .merge(projects::router())
}
