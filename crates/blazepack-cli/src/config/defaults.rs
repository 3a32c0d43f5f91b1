use std::net::{IpAddr, Ipv4Addr};

pub fn default_port() -> u16 {
    3000
}

pub fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

pub fn default_asset_origin() -> String {
    "https://www.unpkg.com/blazepack-core@0.0.2/www".to_string()
}

pub fn default_manifest() -> String {
    blazepack_protocol::DEFAULT_MANIFEST.to_string()
}

pub fn default_spa_fallback() -> bool {
    true
}
