use std::collections::HashSet;
use std::net::IpAddr;

/// The set of client source addresses permitted to use the gateway.
/// Built once at startup from the settings and never mutated.
#[derive(Debug, Clone)]
pub struct AllowList {
    addrs: HashSet<IpAddr>,
}

impl AllowList {
    pub fn new(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        AllowList {
            addrs: addrs.into_iter().collect(),
        }
    }

    pub fn permits(&self, addr: IpAddr) -> bool {
        self.addrs.contains(&addr)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }
}
