/// HTTP endpoint paths for the admin surface.
pub mod endpoints {
    pub const HEALTH: &str = "/v1/health";
    pub const INFO: &str = "/v1/info";
}

/// Health check response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: super::message::PROTOCOL_VERSION,
        }
    }
}

/// Static description of a running server's storage layout and limits.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InfoResponse {
    pub bucket: String,
    pub blob_table: String,
    pub reverse_index_table: String,
    pub min_chunk_size: usize,
    pub max_message_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_defaults() {
        let h = HealthResponse::default();
        assert_eq!(h.status, "ok");
        assert_eq!(h.protocol_version, 1);
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(endpoints::HEALTH, "/v1/health");
        assert_eq!(endpoints::INFO, "/v1/info");
    }

    #[test]
    fn info_json_shape() {
        let info = InfoResponse {
            bucket: "b".into(),
            blob_table: "t1".into(),
            reverse_index_table: "t2".into(),
            min_chunk_size: 10,
            max_message_size: 20,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["bucket"], "b");
        assert_eq!(json["min_chunk_size"], 10);
        let back: InfoResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
