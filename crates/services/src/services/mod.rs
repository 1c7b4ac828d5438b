pub mod chest;
pub mod claude_api;
pub mod config;
pub mod crafting;
pub mod field_cipher;
pub mod loot_factory;
pub mod project;
pub mod quest;
pub mod quest_narrator;
pub mod reward_engine;
