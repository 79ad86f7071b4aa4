//! Rendering of dynamic worker options into a worker start command.
//!
//! A worker command template may contain whole-token placeholders
//! `WORKER_OPTION_0`, `WORKER_OPTION_1`, … which are replaced positionally by
//! the `dynamic_worker_options` of the actor-creation task the worker serves.

use crate::constants::WORKER_OPTION_PLACEHOLDER_PREFIX;
use crate::error::{ControlPlaneError, Result};
use crate::models::TaskSpec;

/// Substitute placeholder tokens in `template` with `options`.
///
/// Tokens that only resemble a placeholder, such as `WORKER_OPTION_x`, are
/// left untouched. Unused options are ignored.
pub fn render_worker_command(template: &[String], options: &[String]) -> Result<Vec<String>> {
    template
        .iter()
        .map(|token| match placeholder_index(token) {
            Some(index) => options.get(index).cloned().ok_or_else(|| {
                ControlPlaneError::invalid_spec(format!(
                    "worker command references {token} but only {} dynamic worker options were given",
                    options.len()
                ))
            }),
            None => Ok(token.clone()),
        })
        .collect()
}

/// Render the command for the worker hosting the actor created by `spec`
pub fn render_for_spec(template: &[String], spec: &TaskSpec) -> Result<Vec<String>> {
    let creation = spec.actor_creation().ok_or_else(|| {
        ControlPlaneError::invalid_spec(format!(
            "task {} is not an actor-creation task",
            spec.task_id()
        ))
    })?;
    render_worker_command(template, &creation.dynamic_worker_options)
}

fn placeholder_index(token: &str) -> Option<usize> {
    let digits = token.strip_prefix(WORKER_OPTION_PLACEHOLDER_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positional_substitution() {
        let template = strings(&["java", "WORKER_OPTION_1", "WORKER_OPTION_0", "Main"]);
        let options = strings(&["-Xmx2g", "-ea"]);
        assert_eq!(
            render_worker_command(&template, &options).unwrap(),
            strings(&["java", "-ea", "-Xmx2g", "Main"])
        );
    }

    #[test]
    fn test_missing_option() {
        let template = strings(&["WORKER_OPTION_2"]);
        let result = render_worker_command(&template, &strings(&["a"]));
        assert!(matches!(result, Err(ControlPlaneError::InvalidTaskSpec(_))));
    }

    #[test]
    fn test_lookalike_tokens_untouched() {
        let template = strings(&["WORKER_OPTION_", "WORKER_OPTION_x", "--WORKER_OPTION_0"]);
        assert_eq!(render_worker_command(&template, &[]).unwrap(), template);
    }
}
