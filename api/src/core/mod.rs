pub mod app_config;
pub mod app_state;
pub mod orphan_cleanup;
pub mod session_registry;

pub mod http {
    pub mod response_envelope;
}
