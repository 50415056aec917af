//! Quota-fallback controller: one retry against the Flash model, made
//! visible to the caller, never a third attempt.

use gmt_core::models::status;
use gmt_core::{EngineError, Invocation, InvocationRequest};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::context::InvocationContext;
use crate::runner::Runner;

/// Invoke with the requested (or default) model; on a quota failure retry
/// exactly once with the configured fallback model.
///
/// A quota failure on the retry is surfaced as-is: the failure mode is
/// "wrong model/quota", not a transient fault, so there is no backoff and no
/// further attempt. If the original request already targeted the fallback
/// model the retry is idempotent and harmless.
pub async fn invoke_with_fallback(
    runner: &dyn Runner,
    config: &EngineConfig,
    req: &InvocationRequest,
    ctx: &InvocationContext,
) -> Result<Invocation, EngineError> {
    let primary_model = req
        .model
        .clone()
        .unwrap_or_else(|| config.default_model.clone());

    let first_error = match runner.run(req, &primary_model, ctx).await {
        Ok(invocation) => return Ok(invocation),
        Err(err @ EngineError::QuotaExceeded { .. }) => err,
        Err(other) => return Err(other),
    };

    warn!(
        model = %primary_model,
        fallback = %config.fallback_model,
        error = %first_error,
        "quota exceeded; retrying with fallback model"
    );
    ctx.progress.emit(status::QUOTA_SWITCHING);
    ctx.progress.emit(status::FLASH_RETRY);

    match runner.run(req, &config.fallback_model, ctx).await {
        Ok(mut invocation) => {
            invocation.used_fallback = true;
            info!(model = %config.fallback_model, "fallback attempt succeeded");
            ctx.progress.emit(status::FLASH_SUCCESS);
            Ok(invocation)
        }
        Err(retry_error) => Err(retry_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted runner: pops one outcome per call and records the model used.
    struct ScriptedRunner {
        outcomes: Mutex<Vec<Result<Invocation, EngineError>>>,
        models_seen: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<Result<Invocation, EngineError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                models_seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.models_seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Runner for ScriptedRunner {
        async fn run(
            &self,
            _req: &InvocationRequest,
            model: &str,
            _ctx: &InvocationContext,
        ) -> Result<Invocation, EngineError> {
            self.models_seen.lock().unwrap().push(model.to_string());
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    fn ok(text: &str) -> Result<Invocation, EngineError> {
        Ok(Invocation {
            text: text.to_string(),
            model: String::new(),
            used_fallback: false,
        })
    }

    fn quota(model: &str) -> Result<Invocation, EngineError> {
        Err(EngineError::QuotaExceeded {
            model: model.to_string(),
            message: "Quota exceeded for quota metric 'requests'".to_string(),
        })
    }

    #[tokio::test]
    async fn test_success_needs_single_attempt() {
        let runner = ScriptedRunner::new(vec![ok("answer")]);
        let config = EngineConfig::default();
        let (ctx, _rx) = InvocationContext::new();

        let result =
            invoke_with_fallback(&runner, &config, &InvocationRequest::new("p"), &ctx)
                .await
                .unwrap();

        assert_eq!(result.text, "answer");
        assert!(!result.used_fallback);
        assert_eq!(runner.calls(), vec![config.default_model.clone()]);
    }

    #[tokio::test]
    async fn test_quota_triggers_exactly_one_fallback_attempt() {
        let runner = ScriptedRunner::new(vec![quota("gemini-3-pro-preview"), ok("fallback output")]);
        let config = EngineConfig::default();
        let (ctx, mut rx) = InvocationContext::new();

        let result =
            invoke_with_fallback(&runner, &config, &InvocationRequest::new("large prompt"), &ctx)
                .await
                .unwrap();

        assert_eq!(result.text, "fallback output");
        assert!(result.used_fallback);
        assert_eq!(
            runner.calls(),
            vec![
                config.default_model.clone(),
                config.fallback_model.clone()
            ]
        );

        // The switch is announced to the caller.
        let messages: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.message)
            .collect();
        assert!(messages.iter().any(|m| m.contains("switching to Flash")));
        assert!(messages.iter().any(|m| m.contains("completed successfully")));
    }

    #[tokio::test]
    async fn test_quota_on_retry_is_final() {
        let runner = ScriptedRunner::new(vec![
            quota("gemini-3-pro-preview"),
            quota("gemini-3-flash-preview"),
        ]);
        let config = EngineConfig::default();
        let (ctx, _rx) = InvocationContext::new();

        let err = invoke_with_fallback(&runner, &config, &InvocationRequest::new("p"), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::QuotaExceeded { .. }));
        // Bounded retry: exactly two attempts, never a third.
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_failure_of_other_kind_surfaced() {
        let runner = ScriptedRunner::new(vec![
            quota("gemini-3-pro-preview"),
            Err(EngineError::Process("spawn failed".to_string())),
        ]);
        let config = EngineConfig::default();
        let (ctx, _rx) = InvocationContext::new();

        let err = invoke_with_fallback(&runner, &config, &InvocationRequest::new("p"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Process(_)));
    }

    #[tokio::test]
    async fn test_non_quota_failure_not_retried() {
        let runner = ScriptedRunner::new(vec![Err(EngineError::Process("exit code 1".into()))]);
        let config = EngineConfig::default();
        let (ctx, _rx) = InvocationContext::new();

        let err = invoke_with_fallback(&runner, &config, &InvocationRequest::new("p"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Process(_)));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_fallback_model_still_retries_once() {
        let runner = ScriptedRunner::new(vec![quota("gemini-3-flash-preview"), ok("second try")]);
        let config = EngineConfig::default();
        let (ctx, _rx) = InvocationContext::new();

        let req = InvocationRequest::new("p")
            .with_model(Some(config.fallback_model.clone()));
        let result = invoke_with_fallback(&runner, &config, &req, &ctx)
            .await
            .unwrap();

        assert!(result.used_fallback);
        assert_eq!(
            runner.calls(),
            vec![config.fallback_model.clone(), config.fallback_model.clone()]
        );
    }
}
