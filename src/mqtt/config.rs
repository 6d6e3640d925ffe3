/// Connection parameters for the subscription client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub topic: String,
    pub client_id: String,
}
