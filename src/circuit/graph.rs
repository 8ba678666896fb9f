//! Circuit graph structure.

use std::collections::HashMap;
use std::sync::Arc;

use super::props::RawValue;
use super::registry::DeviceRegistry;
use super::types::{Branch, BranchId, Environment, Node, NodeId, Unknown};
use crate::components::{Device, DeviceClass, DeviceState};
use crate::error::{Result, VoltaicError};

/// Default name of the ground net.
pub const DEFAULT_GROUND: &str = "0";

/// Alias that always maps to ground, matched case-insensitively.
pub const GROUND_ALIAS: &str = "gnd";

/// One device declaration: the topology input contract.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDecl {
    /// Registry id of the device class
    pub class: String,
    /// Unique instance id
    pub id: String,
    /// Net names, one per class terminal
    pub nodes: Vec<String>,
    /// Instance properties; these override the model's
    pub props: Vec<(String, RawValue)>,
    /// Optional model card name
    pub model: Option<String>,
}

impl DeviceDecl {
    pub fn new(class: impl Into<String>, id: impl Into<String>, nodes: &[&str]) -> Self {
        Self {
            class: class.into(),
            id: id.into(),
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            props: Vec::new(),
            model: None,
        }
    }

    /// Add a property.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.props.push((name.into(), value.into()));
        self
    }

    /// Reference a model card.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A named set of properties for one device class.
#[derive(Debug, Clone)]
pub struct ModelCard {
    pub name: String,
    pub class: &'static DeviceClass,
    pub props: Vec<(String, RawValue)>,
}

/// A circuit: nets, branch unknowns and connected devices.
///
/// Nodes and branches share one index space allocated in creation order;
/// a [`NodeId`] or [`BranchId`] is the row of its unknown in the MNA system.
#[derive(Debug)]
pub struct Circuit {
    registry: Arc<DeviceRegistry>,
    ground: String,
    nodes: Vec<Node>,
    node_map: HashMap<String, NodeId>,
    branches: Vec<Branch>,
    unknowns: Vec<Unknown>,
    devices: Vec<Device>,
    device_map: HashMap<String, usize>,
    models: HashMap<String, ModelCard>,
    params: HashMap<String, f64>,
    env: Environment,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new(Arc::new(DeviceRegistry::standard()))
    }
}

impl Circuit {
    /// Create an empty circuit resolving classes through `registry`.
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self {
            registry,
            ground: DEFAULT_GROUND.to_string(),
            nodes: Vec::new(),
            node_map: HashMap::new(),
            branches: Vec::new(),
            unknowns: Vec::new(),
            devices: Vec::new(),
            device_map: HashMap::new(),
            models: HashMap::new(),
            params: HashMap::new(),
            env: Environment::default(),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Name of the ground net.
    pub fn ground(&self) -> &str {
        &self.ground
    }

    /// Rename the ground net. Fails if a regular node already uses the name.
    pub fn set_ground(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.node_map.contains_key(&name) {
            return Err(VoltaicError::DuplicateNode { node: name });
        }
        self.ground = name;
        Ok(())
    }

    /// Whether a net name designates ground.
    pub fn is_ground_name(&self, name: &str) -> bool {
        name == self.ground || name.eq_ignore_ascii_case(GROUND_ALIAS)
    }

    /// Allocate a new node. Fails if the name is taken or names ground.
    pub fn make_node(&mut self, id: impl Into<String>) -> Result<NodeId> {
        let id = id.into();
        if self.is_ground_name(&id) || self.node_map.contains_key(&id) {
            return Err(VoltaicError::DuplicateNode { node: id });
        }
        Ok(self.alloc_node(id))
    }

    /// Return the node for `id`, ground, or a freshly allocated node.
    pub fn node(&mut self, id: &str) -> NodeId {
        if self.is_ground_name(id) {
            return NodeId::GROUND;
        }
        if let Some(&node) = self.node_map.get(id) {
            return node;
        }
        self.alloc_node(id.to_string())
    }

    fn alloc_node(&mut self, id: String) -> NodeId {
        let index = NodeId(self.unknowns.len());
        self.unknowns.push(Unknown::Voltage(self.nodes.len()));
        self.node_map.insert(id.clone(), index);
        self.nodes.push(Node {
            id,
            index,
            voltage: 0.0,
        });
        index
    }

    /// Allocate a branch current unknown between two nodes.
    pub fn make_branch(&mut self, from: NodeId, to: NodeId) -> BranchId {
        let index = BranchId(self.unknowns.len());
        self.unknowns.push(Unknown::Current(self.branches.len()));
        self.branches.push(Branch {
            index,
            from,
            to,
            current: 0.0,
        });
        index
    }

    /// Whether `node` is ground or a node allocated by this circuit.
    fn owns_node(&self, node: NodeId) -> bool {
        node.is_ground() || matches!(self.unknowns.get(node.0), Some(Unknown::Voltage(_)))
    }

    /// Connect a device to `nodes`, allocating the branches its class needs.
    ///
    /// The device is moved into the circuit.
    pub fn connect(&mut self, mut device: Device, nodes: &[NodeId]) -> Result<()> {
        let class = device.class();
        if nodes.len() != class.terminals.len() {
            return Err(VoltaicError::TerminalCountMismatch {
                device: device.id().to_string(),
                class: class.id.to_string(),
                expected: class.terminals.len(),
                found: nodes.len(),
            });
        }
        if self.device_map.contains_key(device.id()) {
            return Err(VoltaicError::DuplicateDevice {
                id: device.id().to_string(),
            });
        }
        if let Some(stray) = nodes.iter().find(|&&n| !self.owns_node(n)) {
            return Err(VoltaicError::topology(format!(
                "device '{}' connects to {stray}, which is not a node of this circuit",
                device.id()
            )));
        }

        let terminal = |i: usize| nodes.get(i).copied().unwrap_or(NodeId::GROUND);
        let branches = (0..class.branches)
            .map(|_| self.make_branch(terminal(0), terminal(1)))
            .collect();
        device.attach(nodes.to_vec(), branches);
        self.device_map.insert(device.id().to_string(), self.devices.len());
        self.devices.push(device);
        Ok(())
    }

    /// Create and connect a device from a declaration.
    ///
    /// Model properties are applied first, instance properties override
    /// them. Nets are only allocated once the declaration is known to be
    /// valid.
    pub fn declare(&mut self, decl: &DeviceDecl) -> Result<()> {
        let class = self
            .registry
            .get(&decl.class)
            .ok_or_else(|| VoltaicError::UnknownDeviceClass {
                class: decl.class.clone(),
            })?;
        if decl.nodes.len() != class.terminals.len() {
            return Err(VoltaicError::TerminalCountMismatch {
                device: decl.id.clone(),
                class: class.id.to_string(),
                expected: class.terminals.len(),
                found: decl.nodes.len(),
            });
        }
        if self.device_map.contains_key(&decl.id) {
            return Err(VoltaicError::DuplicateDevice { id: decl.id.clone() });
        }

        let mut raw = Vec::new();
        if let Some(name) = &decl.model {
            let model = self.models.get(name).ok_or_else(|| VoltaicError::UnknownModel {
                model: name.clone(),
                device: decl.id.clone(),
            })?;
            if !std::ptr::eq(model.class, class) {
                return Err(VoltaicError::ModelClassMismatch {
                    model: name.clone(),
                    model_class: model.class.id.to_string(),
                    device: decl.id.clone(),
                    device_class: class.id.to_string(),
                });
            }
            raw.extend(model.props.iter().cloned());
        }
        raw.extend(decl.props.iter().cloned());

        let device = Device::new(class, decl.id.clone(), &raw)?;
        let nodes: Vec<NodeId> = decl.nodes.iter().map(|n| self.node(n)).collect();
        self.connect(device, &nodes)
    }

    /// Define a model card. Property names are checked against the class
    /// schema here; values are checked when a device uses the model.
    pub fn add_model(&mut self, name: impl Into<String>, class: &str, props: Vec<(String, RawValue)>) -> Result<()> {
        let name = name.into();
        let class = self
            .registry
            .get(class)
            .ok_or_else(|| VoltaicError::UnknownDeviceClass {
                class: class.to_string(),
            })?;
        if self.models.contains_key(&name) {
            return Err(VoltaicError::DuplicateModel { name });
        }
        for (prop, _) in &props {
            if !class.props.iter().any(|spec| spec.name.eq_ignore_ascii_case(prop)) {
                return Err(VoltaicError::UnknownProperty {
                    device: name,
                    property: prop.clone(),
                });
            }
        }
        self.models.insert(name.clone(), ModelCard { name, class, props });
        Ok(())
    }

    pub fn model(&self, name: &str) -> Option<&ModelCard> {
        self.models.get(name)
    }

    /// Set a named parameter used by property bindings.
    pub fn set_param(&mut self, name: impl Into<String>, value: f64) {
        self.params.insert(name.into(), value);
    }

    /// Resolve a parameter name. `temp`, `time` and `freq` read the
    /// environment.
    pub fn param(&self, name: &str) -> Option<f64> {
        lookup_param(&self.params, &self.env, name)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Re-resolve bindings, zero every unknown and reset each device.
    ///
    /// Calling this twice in a row leaves the circuit in the same state.
    pub fn reset(&mut self) -> Result<()> {
        for node in &mut self.nodes {
            node.voltage = 0.0;
        }
        for branch in &mut self.branches {
            branch.current = 0.0;
        }
        let Self {
            devices, params, env, ..
        } = self;
        let (params, env) = (&*params, &*env);
        for device in devices.iter_mut() {
            device.reset(env, |name| lookup_param(params, env, name))?;
        }
        Ok(())
    }

    /// Whether every device is linear.
    pub fn is_linear(&self) -> bool {
        self.devices.iter().all(Device::is_linear)
    }

    /// Dimension of the MNA system.
    pub fn matrix_size(&self) -> usize {
        self.unknowns.len()
    }

    /// Meaning of each solution entry.
    pub fn unknowns(&self) -> &[Unknown] {
        &self.unknowns
    }

    /// Current node voltages and branch currents as a solution vector.
    pub fn solution_vector(&self) -> Vec<f64> {
        self.unknowns
            .iter()
            .map(|unknown| match *unknown {
                Unknown::Voltage(i) => self.nodes[i].voltage,
                Unknown::Current(i) => self.branches[i].current,
            })
            .collect()
    }

    /// Copy a solution vector into the node voltages and branch currents.
    pub fn apply_solution(&mut self, x: &[f64]) -> Result<()> {
        if x.len() != self.unknowns.len() {
            return Err(VoltaicError::DimensionMismatch {
                expected: self.unknowns.len(),
                found: x.len(),
            });
        }
        for (unknown, &value) in self.unknowns.iter().zip(x) {
            match *unknown {
                Unknown::Voltage(i) => self.nodes[i].voltage = value,
                Unknown::Current(i) => self.branches[i].current = value,
            }
        }
        Ok(())
    }

    /// Copy of every device state buffer, in insertion order.
    pub fn device_states(&self) -> Vec<DeviceState> {
        self.devices.iter().map(|d| *d.state()).collect()
    }

    /// Restore buffers taken with [`Circuit::device_states`].
    pub fn restore_device_states(&mut self, states: &[DeviceState]) {
        for (device, state) in self.devices.iter_mut().zip(states) {
            device.set_state(*state);
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub(crate) fn devices_mut(&mut self) -> &mut [Device] {
        &mut self.devices
    }

    /// Find a node by name; ground resolves to [`NodeId::GROUND`].
    pub fn find_node(&self, id: &str) -> Option<NodeId> {
        if self.is_ground_name(id) {
            Some(NodeId::GROUND)
        } else {
            self.node_map.get(id).copied()
        }
    }

    /// Voltage of a named node. Ground reads as 0.
    pub fn node_voltage(&self, id: &str) -> Option<f64> {
        match self.find_node(id)? {
            NodeId::GROUND => Some(0.0),
            NodeId(row) => match self.unknowns[row] {
                Unknown::Voltage(i) => Some(self.nodes[i].voltage),
                Unknown::Current(_) => None,
            },
        }
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.device_map.get(id).map(|&i| &self.devices[i])
    }
}

fn lookup_param(params: &HashMap<String, f64>, env: &Environment, name: &str) -> Option<f64> {
    match name {
        "temp" => Some(env.temperature),
        "time" => Some(env.time),
        "freq" => Some(env.frequency),
        _ => params.get(name).copied(),
    }
}
