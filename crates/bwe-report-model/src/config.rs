use serde::{Deserialize, Serialize};

/// Run metadata written by the testbed as `config.json`.
///
/// `date` is the run start in unix seconds and doubles as the run identifier;
/// every log of the run is rebased against it.
#[derive(Deserialize, Debug, Clone)]
pub struct RunConfig {
    pub date: i64,
    pub scenario: ScenarioInfo,
    pub connections: Vec<Connection>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioInfo {
    pub name: String,
}

/// One flow of the run: where its logs live and which router shaped it.
#[derive(Deserialize, Debug, Clone)]
pub struct Connection {
    pub name: String,
    pub implementation: String,
    pub router: String,
}

impl RunConfig {
    pub fn basetime_ms(&self) -> i64 {
        self.date * 1_000
    }

    pub fn run_id(&self) -> String {
        self.date.to_string()
    }
}

/// Chart layout constants, passed explicitly instead of living as
/// module-level defaults. Loadable from TOML; `Default` matches the values
/// the reports have always used.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Right edge of the chart time window, in run-relative milliseconds.
    /// Step series are extended to this point.
    pub window_ms: i64,
    pub dpi: u32,
    pub figure_width: f64,
    pub figure_height: f64,
    pub line_width: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_ms: 105_000,
            dpi: 400,
            figure_width: 8.0,
            figure_height: 2.0,
            line_width: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_testbed_run_config() {
        let raw = r#"{
            "date": 1650000000,
            "scenario": {"name": "variable-availability"},
            "connections": [
                {"name": "forward_0", "implementation": "pion-gcc", "router": "leftrouter.log"}
            ]
        }"#;
        let config: RunConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.basetime_ms(), 1_650_000_000_000);
        assert_eq!(config.run_id(), "1650000000");
        assert_eq!(config.scenario.name, "variable-availability");
        assert_eq!(config.connections.len(), 1);
        assert_eq!(config.connections[0].router, "leftrouter.log");
    }

    #[test]
    fn render_config_overrides_merge_with_defaults() {
        let config: RenderConfig = toml::from_str("window_ms = 60000\ndpi = 100\n").unwrap();
        assert_eq!(config.window_ms, 60_000);
        assert_eq!(config.dpi, 100);
        assert_eq!(config.line_width, RenderConfig::default().line_width);
    }
}
