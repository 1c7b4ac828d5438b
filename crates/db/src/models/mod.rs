pub mod daily_chest;
pub mod loot_item;
pub mod project;
pub mod quest;
pub mod user_profile;
