pub struct DefaultsConfig {
    pub replicates: usize,
    pub pipetting: String,
    pub reservoir: String,
    pub partial_hash: bool,
    pub allow_one_to_one: bool,
    pub design_shape: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            replicates: 1,
            pipetting: "BioMek".to_string(),
            reservoir: "standard 96".to_string(),
            partial_hash: false,
            allow_one_to_one: true,
            design_shape: "16x24".to_string(),
        }
    }
}
