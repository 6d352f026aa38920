//! Types that mirror the management server's JSON schema.

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state reported by `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    Running,
    Stopped,
    Starting,
    Stopping,
    Error,
    ShuttingDown,
}

impl ServerState {
    /// Unknown strings map to `Error` so a newer server never breaks polling.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "running" => ServerState::Running,
            "stopped" => ServerState::Stopped,
            "starting" => ServerState::Starting,
            "stopping" => ServerState::Stopping,
            "shutting_down" => ServerState::ShuttingDown,
            _ => ServerState::Error,
        }
    }

    pub fn is_transitional(self) -> bool {
        matches!(self, ServerState::Starting | ServerState::Stopping)
    }

    pub fn label(self) -> &'static str {
        match self {
            ServerState::Running => "Running",
            ServerState::Stopped => "Stopped",
            ServerState::Starting => "Starting",
            ServerState::Stopping => "Stopping",
            ServerState::Error => "Error",
            ServerState::ShuttingDown => "Shutting Down",
        }
    }
}

impl<'de> Deserialize<'de> for ServerState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(ServerState::from_wire(&s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuStats {
    // the manager reports the hottest fan as its load indicator
    #[serde(alias = "fan_speed_percent")]
    pub utilization_percent: u32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub temperature_c: i32,
    #[serde(default = "one")]
    pub gpu_count: u32,
}

fn one() -> u32 {
    1
}

impl GpuStats {
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total_mb == 0 {
            0.0
        } else {
            self.memory_used_mb as f64 / self.memory_total_mb as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub state: ServerState,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub gpu: Option<GpuStats>,
    #[serde(default)]
    pub last_state_change_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<Model>,
}

/// Diagnostic output from `GET /service/status`; rendered verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatusDetails {
    pub service: String,
    pub lines: u32,
    #[serde(rename = "systemctl_status_output")]
    pub systemctl_output: String,
    pub journal_output: String,
    pub generated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_decodes_manager_payload() {
        let json = r#"{
            "state": "starting",
            "model": "qwen-32b",
            "last_state_change_at": "2025-01-01T00:00:00+00:00",
            "checks": {"health_ok": false},
            "gpu": {"fan_speed_percent": 41, "memory_used_mb": 20480,
                    "memory_total_mb": 49152, "temperature_c": 63, "gpu_count": 2}
        }"#;
        let s: ServerStatus = serde_json::from_str(json).unwrap();
        assert_eq!(s.state, ServerState::Starting);
        assert_eq!(s.model.as_deref(), Some("qwen-32b"));
        assert!(s.error.is_none());
        assert_eq!(
            s.last_state_change_at.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
        let gpu = s.gpu.unwrap();
        assert_eq!(gpu.utilization_percent, 41);
        assert_eq!(gpu.gpu_count, 2);
    }

    #[test]
    fn unknown_state_maps_to_error() {
        let s: ServerStatus = serde_json::from_str(r#"{"state":"rebooting"}"#).unwrap();
        assert_eq!(s.state, ServerState::Error);
        assert_eq!(ServerState::from_wire("shutting_down"), ServerState::ShuttingDown);
    }

    #[test]
    fn only_starting_and_stopping_are_transitional() {
        let transitional: Vec<_> = [
            ServerState::Running,
            ServerState::Stopped,
            ServerState::Starting,
            ServerState::Stopping,
            ServerState::Error,
            ServerState::ShuttingDown,
        ]
        .into_iter()
        .filter(|s| s.is_transitional())
        .collect();
        assert_eq!(transitional, vec![ServerState::Starting, ServerState::Stopping]);
    }

    #[test]
    fn memory_percent_handles_zero_total() {
        let mut g = GpuStats {
            utilization_percent: 0,
            memory_used_mb: 512,
            memory_total_mb: 0,
            temperature_c: 30,
            gpu_count: 1,
        };
        assert_eq!(g.memory_percent(), 0.0);
        g.memory_total_mb = 2048;
        assert!((g.memory_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn models_ignore_script_field() {
        let r: ModelsResponse = serde_json::from_str(
            r#"{"models":[{"id":"a","script":"/opt/a.sh","active":false},{"id":"b","script":"/opt/b.sh","active":true}]}"#,
        )
        .unwrap();
        assert_eq!(r.models.len(), 2);
        assert!(r.models[1].active);
    }
}
