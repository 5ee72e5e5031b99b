//! Shared Kafka client configuration for the consumer and the dead-letter producer.

use rdkafka::config::ClientConfig;

/// Connection settings for a Kafka cluster.
#[derive(Debug, Clone)]
pub struct KafkaConnection {
    /// Kafka broker addresses (comma-separated)
    pub brokers: String,
    /// SASL username (enables SASL/SSL if set)
    pub username: Option<String>,
    /// SASL password (required if username is set)
    pub password: Option<String>,
}

impl KafkaConnection {
    /// Create plaintext connection settings.
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            username: None,
            password: None,
        }
    }

    /// Set SASL credentials.
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    /// Returns true if SASL/SSL will be used.
    pub fn uses_sasl(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Base client configuration with brokers and, when credentials are present,
    /// SASL/SSL authentication. Plaintext otherwise (local development).
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.brokers);

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password);
        }

        config
    }
}
