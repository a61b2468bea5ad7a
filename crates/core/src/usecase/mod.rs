pub mod dashboard;
pub mod dashboard_state;
pub mod preference_store;
pub mod transition_engine;

pub use dashboard::{DashboardController, DashboardView, RefreshSummary};
pub use dashboard_state::{DashboardState, StateHandle};
pub use preference_store::PreferenceStore;
pub use transition_engine::TransitionEngine;
