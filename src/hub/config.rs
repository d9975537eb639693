//! Group configuration

/// Configuration shared by every group of one server instance
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Enable the native RTMP egress
    pub rtmp_enabled: bool,

    /// GOP ring size of the RTMP cache; 0 disables frame caching, a
    /// negative value means "as many as memory allows" and is clamped
    /// internally
    pub rtmp_gop_num: i32,

    /// Enable the HTTP-FLV egress
    pub httpflv_enabled: bool,

    /// GOP ring size of the HTTP-FLV cache
    pub httpflv_gop_num: i32,

    /// Enable HLS muxing (requires a muxer factory on the group)
    pub hls_enabled: bool,

    /// Enable pulling the stream from an upstream peer when subscribers
    /// arrive before a publisher
    pub relay_pull_enabled: bool,

    /// Upstream host[:port] to pull from
    pub relay_pull_addr: String,

    /// Enable pushing the stream to downstream peers
    pub relay_push_enabled: bool,

    /// Downstream host[:port] list to push to
    pub relay_push_addr_list: Vec<String>,

    /// Connect timeout of one push attempt, milliseconds
    pub relay_push_connect_timeout_ms: u64,

    /// Total timeout of one push attempt, milliseconds
    pub relay_push_timeout_ms: u64,

    /// Per-write timeout for pushed audio/video, milliseconds
    pub relay_push_write_av_timeout_ms: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            rtmp_enabled: true,
            rtmp_gop_num: 2,
            httpflv_enabled: true,
            httpflv_gop_num: 2,
            hls_enabled: false,
            relay_pull_enabled: false,
            relay_pull_addr: String::new(),
            relay_push_enabled: false,
            relay_push_addr_list: Vec::new(),
            relay_push_connect_timeout_ms: 5000,
            relay_push_timeout_ms: 10000,
            relay_push_write_av_timeout_ms: 10000,
        }
    }
}

impl GroupConfig {
    /// Set both GOP ring sizes at once
    pub fn gop_num(mut self, n: i32) -> Self {
        self.rtmp_gop_num = n;
        self.httpflv_gop_num = n;
        self
    }

    /// Enable HLS output
    pub fn enable_hls(mut self) -> Self {
        self.hls_enabled = true;
        self
    }

    /// Enable relay pull from the given upstream address
    pub fn relay_pull(mut self, addr: impl Into<String>) -> Self {
        self.relay_pull_enabled = true;
        self.relay_pull_addr = addr.into();
        self
    }

    /// Enable relay push to the given downstream addresses
    pub fn relay_push(mut self, addrs: Vec<String>) -> Self {
        self.relay_push_enabled = true;
        self.relay_push_addr_list = addrs;
        self
    }
}
