// Agent invoker backed by an external CLI command

use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::config::CommandConfig;
use crate::coordinator::{AgentInvoker, InvocationReply, InvocationRequest};
use crate::errors::AgentInvocationError;
use crate::utils::truncate_chars;

/// Placeholder replaced by the prompt in configured arguments
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Runs one configured command per call and returns its stdout
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    config: CommandConfig,
}

impl CommandInvoker {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    pub fn command(&self) -> &str {
        &self.config.command
    }

    /// Whether the command resolves to an executable
    pub fn is_available(&self) -> bool {
        which::which(&self.config.command).is_ok()
    }

    /// Arguments for one call: placeholders substituted, or prompt appended
    pub fn build_args(&self, prompt: &str) -> Vec<String> {
        let has_placeholder = self
            .config
            .args
            .iter()
            .any(|a| a.contains(PROMPT_PLACEHOLDER));

        let mut args: Vec<String> = self
            .config
            .args
            .iter()
            .map(|a| a.replace(PROMPT_PLACEHOLDER, prompt))
            .collect();
        if !has_placeholder {
            args.push(prompt.to_string());
        }
        args
    }
}

/// Extract a self-reported confidence such as "Confidence: 85%"
pub fn extract_confidence(response: &str) -> Option<u8> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let re = PATTERN
        .get_or_init(|| Regex::new(r"(?i)confidence(?:\s+level)?[:\s]+(\d{1,3})%?").ok())
        .as_ref()?;

    let caps = re.captures_iter(response).last()?;
    let value = caps.get(1)?.as_str().parse::<u16>().ok()?;
    Some(value.min(100) as u8)
}

#[async_trait]
impl AgentInvoker for CommandInvoker {
    async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationReply, AgentInvocationError> {
        let agent_id = request.agent_id.as_str();

        if !self.is_available() {
            return Err(AgentInvocationError::Unavailable {
                agent_id: agent_id.to_string(),
                command: self.config.command.clone(),
            });
        }

        let mut cmd = Command::new(&self.config.command);
        cmd.args(self.build_args(&request.prompt))
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        log::debug!(
            "Spawning {} for agent {} ({})",
            self.config.command,
            agent_id,
            request.kind
        );

        let mut child = cmd.spawn().map_err(|e| {
            AgentInvocationError::failed(
                agent_id,
                format!("Failed to spawn {}: {}", self.config.command, e),
            )
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentInvocationError::failed(agent_id, "Failed to capture stdout"))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
                buf
            })
        });

        let mut reader = BufReader::new(stdout).lines();
        let mut output = String::new();
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => {
                    output.push_str(&line);
                    output.push('\n');
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(AgentInvocationError::failed(
                        agent_id,
                        format!("Read error: {}", e),
                    ))
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            AgentInvocationError::failed(agent_id, format!("Failed to wait for process: {}", e))
        })?;

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            let detail = stderr.trim();
            let message = if detail.is_empty() {
                format!("exited with {}", status)
            } else {
                format!("exited with {}: {}", status, truncate_chars(detail, 200))
            };
            return Err(AgentInvocationError::failed(agent_id, message));
        }

        let content = output.trim().to_string();
        if content.is_empty() {
            return Err(AgentInvocationError::failed(agent_id, "produced no output"));
        }

        Ok(InvocationReply {
            confidence: extract_confidence(&content),
            content,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionKind;
    use std::collections::BTreeMap;

    fn invoker(command: &str, args: &[&str]) -> CommandInvoker {
        CommandInvoker::new(CommandConfig {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: None,
            env: BTreeMap::new(),
        })
    }

    fn request(prompt: &str) -> InvocationRequest {
        InvocationRequest {
            turn_id: "t1".to_string(),
            agent_id: "research".to_string(),
            kind: InteractionKind::Request,
            round: None,
            prompt: prompt.to_string(),
        }
    }

    #[test]
    fn test_extract_confidence_percentage() {
        let response = "Based on my analysis, my confidence: 85%";
        assert_eq!(extract_confidence(response), Some(85));
    }

    #[test]
    fn test_extract_confidence_level() {
        assert_eq!(extract_confidence("Confidence Level: 90"), Some(90));
    }

    #[test]
    fn test_extract_confidence_none() {
        assert_eq!(extract_confidence("An answer without a score"), None);
    }

    #[test]
    fn test_extract_confidence_capped_at_100() {
        assert_eq!(extract_confidence("Confidence: 150%"), Some(100));
    }

    #[test]
    fn test_placeholder_substitution() {
        let inv = invoker("claude", &["-p", "{prompt}", "--quiet"]);
        assert_eq!(inv.build_args("hello"), vec!["-p", "hello", "--quiet"]);
    }

    #[test]
    fn test_prompt_appended_without_placeholder() {
        let inv = invoker("opencode", &["run"]);
        assert_eq!(inv.build_args("hello"), vec!["run", "hello"]);
    }

    #[tokio::test]
    async fn test_missing_command_is_unavailable() {
        let inv = invoker("this-command-definitely-does-not-exist-12345", &[]);
        let err = inv.invoke(request("hi")).await.unwrap_err();
        assert!(matches!(err, AgentInvocationError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_command_output() {
        let inv = invoker("echo", &["Answer for {prompt}. Confidence: 70%"]);
        let reply = inv.invoke(request("pricing")).await.unwrap();
        assert_eq!(reply.content, "Answer for pricing. Confidence: 70%");
        assert_eq!(reply.confidence, Some(70));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_fails() {
        let inv = invoker("sh", &["-c", "echo oops >&2; exit 3", "{prompt}"]);
        let err = inv.invoke(request("x")).await.unwrap_err();
        match err {
            AgentInvocationError::Failed { message, .. } => assert!(message.contains("oops")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
