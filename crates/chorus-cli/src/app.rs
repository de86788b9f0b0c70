//! Wiring: completion provider, tool providers, agents, conversation

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, bail};
use chorus_core::builtin::{
    CREATE_PLAN_TOOL, READ_FROM_FILE_TOOL, SUMMARIZE_TOOL, WRITE_TO_FILE_TOOL,
};
use chorus_core::conversation::{DELEGATE_TOOL, FINISH_TOOL};
use chorus_core::{
    Agent, CompletionProvider, Conversation, Observer, ToolDescriptor, TracingObserver, Workspace,
    standard_tools,
};
use chorus_mcp::{ServerConfig, ToolProviderClient};
use chorus_runtime::OpenAiProvider;
use tracing::{info, warn};

use crate::config::{AgentConfig, Config};

const BUILTIN_TOOLS: [&str; 6] = [
    WRITE_TO_FILE_TOOL,
    READ_FROM_FILE_TOOL,
    SUMMARIZE_TOOL,
    CREATE_PLAN_TOOL,
    DELEGATE_TOOL,
    FINISH_TOOL,
];

/// Run `objective` against the configured endpoint and tool providers
pub async fn run(config: &Config, objective: &str) -> anyhow::Result<String> {
    let provider: Arc<dyn CompletionProvider> = Arc::new(
        OpenAiProvider::new(config.openai()).context("failed to create completion provider")?,
    );
    match provider.health_check().await {
        Ok(true) => info!("✓ Connected to {}", config.openai().base_url),
        Ok(false) | Err(_) => warn!("⚠ Completion endpoint not reachable, continuing anyway"),
    }

    let observer: Arc<dyn Observer> = Arc::new(TracingObserver);
    let clients = connect_all(&config.mcp_servers, &observer).await?;

    let outcome = run_with(config, objective, provider, &clients, observer).await;

    for client in &clients {
        client.close().await;
    }
    outcome
}

/// Start every tool provider; the first failure closes the ones already up
async fn connect_all(
    servers: &[ServerConfig],
    observer: &Arc<dyn Observer>,
) -> anyhow::Result<Vec<Arc<ToolProviderClient>>> {
    let mut clients = Vec::with_capacity(servers.len());
    for server in servers {
        match ToolProviderClient::connect(server, Arc::clone(observer)).await {
            Ok(client) => {
                info!("✓ Started tool provider {}", client.label());
                clients.push(Arc::new(client));
            }
            Err(e) => {
                for client in &clients {
                    client.close().await;
                }
                return Err(e).with_context(|| format!("failed to start tool provider '{}'", server.label()));
            }
        }
    }
    Ok(clients)
}

pub async fn run_with(
    config: &Config,
    objective: &str,
    provider: Arc<dyn CompletionProvider>,
    clients: &[Arc<ToolProviderClient>],
    observer: Arc<dyn Observer>,
) -> anyhow::Result<String> {
    let mut groups = Vec::with_capacity(clients.len());
    for client in clients {
        let tools = client
            .tool_descriptors()
            .await
            .with_context(|| format!("failed to list tools of '{}'", client.label()))?;
        info!("  {} tools from {}", tools.len(), client.label());
        groups.push((client.label().to_string(), tools));
    }
    let remote = merge_tools(groups)?;

    let workspace = Arc::new(Workspace::new(config.workspace.clone()));
    let agents = build_agents(&config.agents, &provider, &workspace, &remote)?;

    let mut conversation = Conversation::with_workspace(agents, workspace)?
        .with_max_turns(config.max_turns)?
        .with_worker_max_steps(config.worker_max_steps)
        .with_observer(observer);

    info!(
        conversation = %conversation.id(),
        orchestrator = conversation.orchestrator().name(),
        workers = ?conversation.worker_names(),
        "Starting conversation"
    );
    Ok(conversation.run(objective).await?)
}

/// Flatten provider tool lists, rejecting names exported twice or
/// shadowing a builtin
pub fn merge_tools(groups: Vec<(String, Vec<ToolDescriptor>)>) -> anyhow::Result<Vec<ToolDescriptor>> {
    let mut owners: HashMap<String, String> = HashMap::new();
    let mut merged = Vec::new();
    for (label, tools) in groups {
        for tool in tools {
            if BUILTIN_TOOLS.contains(&tool.name.as_str()) {
                bail!("tool provider '{label}' exports '{}', which is a builtin tool", tool.name);
            }
            if let Some(owner) = owners.insert(tool.name.clone(), label.clone()) {
                bail!("tool '{}' is exported by both '{owner}' and '{label}'", tool.name);
            }
            merged.push(tool);
        }
    }
    Ok(merged)
}

/// Every agent gets the standard tools plus all provider tools
pub fn build_agents(
    configs: &[AgentConfig],
    provider: &Arc<dyn CompletionProvider>,
    workspace: &Arc<Workspace>,
    remote: &[ToolDescriptor],
) -> anyhow::Result<Vec<Agent>> {
    configs
        .iter()
        .map(|cfg| {
            let options = cfg.generation_options();
            let mut builder = Agent::builder()
                .role(cfg.role)
                .provider(Arc::clone(provider))
                .options(options.clone())
                .tools(standard_tools(workspace, Arc::clone(provider), options))
                .tools(remote.iter().cloned());
            if !cfg.name.is_empty() {
                builder = builder.name(&cfg.name);
            }
            if let Some(system) = &cfg.system_message {
                builder = builder.system_message(system);
            }
            let agent = builder
                .build()
                .with_context(|| format!("failed to build agent '{}'", cfg.name))?;
            info!(agent = agent.name(), role = %agent.role(), model = agent.model(), "✓ Agent ready");
            Ok(agent)
        })
        .collect()
}
