//! Tool definitions.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolsmith_sandbox::FunctionArg;

/// Source repository of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/repo`.
    pub name: String,
    /// Clone URL.
    pub url: String,
    /// Commit to check out.
    #[serde(default)]
    pub commit: Option<String>,
    /// Environment variables the repository needs at install and run time.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Repository {
    /// Repository name without the owner.
    pub fn name_without_owner(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Clone instructions for prompts.
    pub fn info(&self) -> String {
        match &self.commit {
            Some(commit) => format!("{} (at commit {commit})", self.url),
            None => self.url.clone(),
        }
    }
}

/// One argument of the tool function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    /// Parameter name.
    pub name: String,
    /// What the argument means.
    pub description: String,
    /// Python type annotation.
    #[serde(rename = "type")]
    pub arg_type: String,
}

/// One key of the dict the tool function returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnDefinition {
    /// Key name.
    pub name: String,
    /// What the value means.
    pub description: String,
}

/// Arguments to call the tool function with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Arguments, in declaration order.
    pub arguments: Vec<FunctionArg>,
}

impl ToolInvocation {
    /// Value supplied for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }
}

/// Everything needed to build a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Python function name.
    pub name: String,
    /// What the function does.
    pub description: String,
    /// Repository the function wraps.
    pub repo: Repository,
    /// Parameters.
    #[serde(default)]
    pub arguments: Vec<ArgumentDefinition>,
    /// Keys of the returned dict.
    #[serde(default)]
    pub returns: Vec<ReturnDefinition>,
    /// Invocation used while building the tool.
    pub example: ToolInvocation,
    /// Further invocations, by name.
    #[serde(default)]
    pub test_invocations: BTreeMap<String, ToolInvocation>,
}

impl ToolDefinition {
    /// Where the repository is installed inside the sandbox.
    pub fn install_path(&self, workspace_dir: &Path) -> PathBuf {
        workspace_dir.join(self.repo.name_without_owner())
    }

    /// Invocation called `name`: `"example"` or a test invocation.
    pub fn invocation(&self, name: &str) -> Option<&ToolInvocation> {
        if name == "example" {
            return Some(&self.example);
        }
        self.test_invocations.get(name)
    }

    /// Python signature with docstring, defaults taken from the example.
    pub fn signature(&self) -> String {
        let params = self
            .arguments
            .iter()
            .map(|arg| match self.example.get(&arg.name) {
                Some(value) => format!("{}: {} = {}", arg.name, arg.arg_type, python_literal(value)),
                None => format!("{}: {}", arg.name, arg.arg_type),
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = format!("def {}({params}) -> dict:\n    \"\"\"\n", self.name);
        for line in self.description.lines() {
            let _ = writeln!(out, "    {line}");
        }
        if !self.arguments.is_empty() {
            out.push_str("\n    Args:\n");
            for arg in &self.arguments {
                let _ = writeln!(out, "        {}: {}", arg.name, arg.description);
            }
        }
        out.push_str("\n    Returns:\n");
        out.push_str(&indent(&self.description_of_returns(), "        "));
        out.push_str("\n    \"\"\"\n");
        out
    }

    /// Prose description of the returned dict.
    pub fn description_of_returns(&self) -> String {
        if self.returns.is_empty() {
            return "dict: the result of the function".into();
        }
        let mut out = String::from("dict with the following structure:\n{\n");
        for ret in &self.returns {
            let _ = writeln!(out, "  '{}': {}", ret.name, ret.description);
        }
        out.push('}');
        out
    }

    /// Arguments as `<argument>` elements, one per line.
    pub fn arguments_xml(&self) -> String {
        self.arguments
            .iter()
            .map(|arg| {
                format!(
                    "<argument>{}: {} ({})</argument>",
                    arg.name, arg.arg_type, arg.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Compact XML summary of the task for prompts.
    pub fn xml_summary(&self) -> String {
        let returns = self
            .returns
            .iter()
            .map(|ret| format!("<return>{}: {}</return>", ret.name, ret.description))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "<name>{}</name>\n<description>\n{}\n</description>\n<arguments>\n{}\n</arguments>\n<returns>\n{returns}\n</returns>",
            self.name,
            self.description,
            self.arguments_xml(),
        )
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a JSON value as a Python literal.
fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".into(),
        Value::Bool(true) => "True".into(),
        Value::Bool(false) => "False".into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => Value::String(s.clone()).to_string(),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(python_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), python_literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}
