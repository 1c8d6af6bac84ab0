use crate::config::GraphBounds;
use crate::error::GraphError;

/// A single structural edge: one plug of one node.
///
/// `position` is assigned by [`Graph::add_connection`](super::Graph::add_connection)
/// and stays zero for candidates. `heuristic` is only meaningful for labelled
/// candidates decoded from a training request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub node_index: u32,
    pub node_type: u32,
    pub plug_index: u32,
    pub plug_type: u32,
    pub position: usize,
    pub heuristic: f32,
}

impl Connection {
    pub fn new(node_index: u32, node_type: u32, plug_index: u32, plug_type: u32) -> Self {
        Self {
            node_index,
            node_type,
            plug_index,
            plug_type,
            position: 0,
            heuristic: 0.0,
        }
    }

    /// A candidate connection carrying a training label.
    pub fn with_heuristic(mut self, heuristic: f32) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Like [`with_heuristic`](Self::with_heuristic), but rejects labels that are not
    /// finite or fall outside `[0, 1]`.
    pub fn try_with_heuristic(self, heuristic: f32) -> Result<Self, GraphError> {
        Ok(self.with_heuristic(check_label(heuristic)?))
    }

    /// Builds a connection from raw signed wire values, rejecting anything outside `bounds`.
    pub fn from_raw(raw: [i32; 4], bounds: &GraphBounds) -> Result<Self, GraphError> {
        Ok(Self::new(
            check_index("node_index", raw[0], bounds.max_nodes)?,
            check_index("node_type", raw[1], bounds.num_node_types)?,
            check_index("plug_index", raw[2], bounds.max_plugs)?,
            check_index("plug_type", raw[3], bounds.num_data_types)?,
        ))
    }

    /// Checks every index field against its table size, and the label against `[0, 1]`.
    pub fn validate(&self, bounds: &GraphBounds) -> Result<(), GraphError> {
        let fields = [
            ("node_index", self.node_index, bounds.max_nodes),
            ("node_type", self.node_type, bounds.num_node_types),
            ("plug_index", self.plug_index, bounds.max_plugs),
            ("plug_type", self.plug_type, bounds.num_data_types),
        ];
        for (field, value, bound) in fields {
            if value as usize >= bound {
                return Err(GraphError::IndexOutOfRange {
                    field,
                    value: value as i64,
                    bound,
                });
            }
        }
        check_label(self.heuristic)?;
        Ok(())
    }

    /// The four lookup indices in table order.
    pub(crate) fn indices(&self) -> [u32; 4] {
        [self.node_index, self.node_type, self.plug_index, self.plug_type]
    }
}

fn check_index(field: &'static str, value: i32, bound: usize) -> Result<u32, GraphError> {
    if value < 0 || value as usize >= bound {
        return Err(GraphError::IndexOutOfRange {
            field,
            value: value as i64,
            bound,
        });
    }
    Ok(value as u32)
}

fn check_label(value: f32) -> Result<f32, GraphError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GraphError::InvalidLabel { value });
    }
    Ok(value)
}
