//! Explicit registration table of the tools a deployment serves.

// self
use crate::{_prelude::*, error::ConfigError};

/// Identity of a tool: its type and its id within that type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolKey {
	/// Tool family, e.g. `deep_linking` or `coursework`.
	pub tool_type: String,
	/// Tool id within the family.
	pub id: String,
}
impl ToolKey {
	/// Creates a key.
	pub fn new(tool_type: impl Into<String>, id: impl Into<String>) -> Self {
		Self { tool_type: tool_type.into(), id: id.into() }
	}
}
impl Display for ToolKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}", self.tool_type, self.id)
	}
}

/// Static description of one tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
	/// Tool identity.
	#[serde(flatten)]
	pub key: ToolKey,
	/// Path the platform launches the tool at.
	pub launch_uri: String,
	/// Whether the tool calls the platform's proprietary REST API.
	#[serde(default)]
	pub uses_platform_rest: bool,
}
impl ToolDescriptor {
	/// Describes a tool that only uses LTI services.
	pub fn new(key: ToolKey, launch_uri: impl Into<String>) -> Self {
		Self { key, launch_uri: launch_uri.into(), uses_platform_rest: false }
	}

	/// Marks the tool as a platform REST API client.
	pub fn with_platform_rest(mut self) -> Self {
		self.uses_platform_rest = true;

		self
	}
}

/// Lookup table of registered tools, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
	tools: HashMap<ToolKey, ToolDescriptor>,
	launch_uris: HashMap<String, ToolKey>,
}
impl ToolRegistry {
	/// Builds the table, rejecting duplicate keys and duplicate launch URIs.
	pub fn build(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Result<Self, ConfigError> {
		let mut registry = Self::default();

		for descriptor in descriptors {
			if registry.tools.contains_key(&descriptor.key)
				|| registry.launch_uris.contains_key(&descriptor.launch_uri)
			{
				return Err(ConfigError::DuplicateTool { tool: descriptor.key.to_string() });
			}

			tracing::debug!(tool = %descriptor.key, launch_uri = %descriptor.launch_uri, "Registered tool.");
			registry.launch_uris.insert(descriptor.launch_uri.clone(), descriptor.key.clone());
			registry.tools.insert(descriptor.key.clone(), descriptor);
		}

		Ok(registry)
	}

	/// Descriptor registered under `key`.
	pub fn get(&self, key: &ToolKey) -> Option<&ToolDescriptor> {
		self.tools.get(key)
	}

	/// Descriptor of the tool launched at `launch_uri`.
	pub fn by_launch_uri(&self, launch_uri: &str) -> Option<&ToolDescriptor> {
		self.tools.get(self.launch_uris.get(launch_uri)?)
	}

	/// Every registered descriptor, in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
		self.tools.values()
	}

	/// Number of registered tools.
	pub fn len(&self) -> usize {
		self.tools.len()
	}

	/// Returns `true` when no tool is registered.
	pub fn is_empty(&self) -> bool {
		self.tools.is_empty()
	}

	/// Returns `true` if any tool calls the platform REST API.
	pub fn uses_platform_rest(&self) -> bool {
		self.tools.values().any(|tool| tool.uses_platform_rest)
	}
}
