use super::NodeId;
use core::fmt;

/// One side of an edge: a node and a port index on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port {
    pub node: NodeId,
    pub port: usize,
}

/// Audio connection from an output port to an input port.
///
/// Several edges may feed the same input (they are summed) and one output may
/// fan out to many inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: Port,
    pub to: Port,
}

impl Edge {
    pub fn new(from: NodeId, output: usize, to: NodeId, input: usize) -> Self {
        Self {
            from: Port { node: from, port: output },
            to: Port { node: to, port: input },
        }
    }

    /// Port 0 to port 0.
    pub fn mono(from: NodeId, to: NodeId) -> Self {
        Self::new(from, 0, to, 0)
    }

    #[inline]
    pub fn touches(&self, id: NodeId) -> bool {
        self.from.node == id || self.to.node == id
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.from.node, self.from.port, self.to.node, self.to.port
        )
    }
}
