//! Question answering service
//!
//! Fetches the corpus, assembles bounded context, asks the model and
//! filters the reply. Store trouble and empty corpora degrade to the
//! fallback answer; model failures do not.

use crate::context::{apply_guard_rail, assemble_context, AnswerGenerator};
use crate::db::ArticleStore;
use crate::errors::Result;
use crate::metrics;
use crate::FALLBACK_ANSWER;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why the fallback answer was returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    StoreUnavailable,
    StoreReadFailed,
    EmptyCorpus,
    NotInContext,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::StoreUnavailable => "store_unavailable",
            FallbackReason::StoreReadFailed => "store_read_failed",
            FallbackReason::EmptyCorpus => "empty_corpus",
            FallbackReason::NotInContext => "not_in_context",
        }
    }
}

/// Result of answering one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Grounded(String),
    Fallback(FallbackReason),
}

impl Answer {
    /// Text returned to the caller
    pub fn text(&self) -> &str {
        match self {
            Answer::Grounded(text) => text,
            Answer::Fallback(_) => FALLBACK_ANSWER,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Answer::Grounded(text) => text,
            Answer::Fallback(_) => FALLBACK_ANSWER.to_string(),
        }
    }

    /// Metric label for this outcome
    pub fn label(&self) -> &'static str {
        match self {
            Answer::Grounded(_) => "grounded",
            Answer::Fallback(reason) => reason.as_str(),
        }
    }
}

pub struct AnswerService {
    store: Arc<dyn ArticleStore>,
    generator: AnswerGenerator,
    max_chars: usize,
}

impl AnswerService {
    pub fn new(store: Arc<dyn ArticleStore>, generator: AnswerGenerator, max_chars: usize) -> Self {
        Self {
            store,
            generator,
            max_chars,
        }
    }

    /// Answer `question` from the stored corpus.
    ///
    /// Only model invocation and model configuration errors are returned
    /// as errors.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let answer = self.resolve(question).await?;

        metrics::record_answer(answer.label());
        info!(outcome = answer.label(), "Question answered");

        Ok(answer)
    }

    async fn resolve(&self, question: &str) -> Result<Answer> {
        if let Err(e) = self.store.connect().await {
            warn!(error = %e, "Article store unavailable, answering with fallback");
            return Ok(Answer::Fallback(FallbackReason::StoreUnavailable));
        }

        let articles = match self.store.fetch_all_articles().await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(error = %e, "Failed to read articles, answering with fallback");
                return Ok(Answer::Fallback(FallbackReason::StoreReadFailed));
            }
        };

        if articles.is_empty() {
            debug!("No articles stored");
            return Ok(Answer::Fallback(FallbackReason::EmptyCorpus));
        }

        let context = assemble_context(&articles, self.max_chars);
        debug!(
            articles = articles.len(),
            context_chars = context.chars().count(),
            "Context assembled"
        );

        let reply = self.generator.generate_answer(&context, question).await?;
        let text = apply_guard_rail(&reply);

        if text == FALLBACK_ANSWER {
            Ok(Answer::Fallback(FallbackReason::NotInContext))
        } else {
            Ok(Answer::Grounded(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::db::{create_store, Article};
    use crate::errors::AppError;
    use crate::testing::{unreachable_db_config, FailOn, FlakyStore, Reply, ScriptedModel};
    use std::time::{Duration, Instant};

    fn corpus() -> Vec<Article> {
        vec![
            Article::new("Widgets", "Widgets are blue."),
            Article::new("Gadgets", "Gadgets hum at night."),
        ]
    }

    async fn service(fail_on: FailOn, articles: &[Article], reply: Reply) -> (AnswerService, Arc<ScriptedModel>) {
        let store = Arc::new(FlakyStore::new(fail_on, articles).await);
        let model = Arc::new(ScriptedModel::new(reply));
        let generator = AnswerGenerator::new(model.clone());
        (AnswerService::new(store, generator, 12_000), model)
    }

    #[tokio::test]
    async fn test_grounded_answer() {
        let (service, model) =
            service(FailOn::Nothing, &corpus(), Reply::Text(" Widgets are blue. ".into())).await;

        let answer = service.answer("What colour are widgets?").await.unwrap();

        assert_eq!(answer, Answer::Grounded("Widgets are blue.".into()));
        assert_eq!(answer.label(), "grounded");

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("Title: Widgets\nContent: Widgets are blue.\n---\nTitle: Gadgets"));
        assert!(prompt.contains("Question: What colour are widgets?"));
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_model() {
        let (service, model) = service(FailOn::Nothing, &[], Reply::Text("anything".into())).await;

        let answer = service.answer("Anything?").await.unwrap();

        assert_eq!(answer, Answer::Fallback(FallbackReason::EmptyCorpus));
        assert_eq!(answer.text(), FALLBACK_ANSWER);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_fallback() {
        let (down, model) = service(FailOn::Connect, &corpus(), Reply::Text("x".into())).await;
        assert_eq!(
            down.answer("q").await.unwrap(),
            Answer::Fallback(FallbackReason::StoreUnavailable)
        );
        assert_eq!(model.calls(), 0);

        let (unreadable, model) = service(FailOn::Read, &corpus(), Reply::Text("x".into())).await;
        assert_eq!(
            unreadable.answer("q").await.unwrap(),
            Answer::Fallback(FallbackReason::StoreReadFailed)
        );
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_out_of_context_reply() {
        let (service, _) = service(
            FailOn::Nothing,
            &corpus(),
            Reply::Text("Sorry, that is Not In Context.".into()),
        )
        .await;

        let answer = service.answer("Who won the match?").await.unwrap();
        assert_eq!(answer, Answer::Fallback(FallbackReason::NotInContext));
        assert_eq!(answer.into_text(), FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn test_literal_fallback_reply() {
        let (service, _) =
            service(FailOn::Nothing, &corpus(), Reply::Text(FALLBACK_ANSWER.into())).await;

        let answer = service.answer("q").await.unwrap();
        assert_eq!(answer, Answer::Fallback(FallbackReason::NotInContext));
    }

    #[tokio::test]
    async fn test_unreachable_store_answers_promptly() {
        let store = create_store(&unreachable_db_config());
        let model = Arc::new(ScriptedModel::new(Reply::Text("x".into())));
        let service = Arc::new(AnswerService::new(store, AnswerGenerator::new(model.clone()), 100));
        let start = Instant::now();

        let questions = (0..4).map(|_| {
            let service = service.clone();
            async move { service.answer("q").await }
        });
        let answers = futures::future::join_all(questions).await;

        for answer in answers {
            assert_eq!(answer.unwrap(), Answer::Fallback(FallbackReason::StoreUnavailable));
        }
        assert!(
            start.elapsed() < Duration::from_secs(4),
            "answers queued behind each other: {:?}",
            start.elapsed()
        );
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_is_error() {
        let (service, _) = service(FailOn::Nothing, &corpus(), Reply::Fail).await;

        let err = service.answer("q").await.unwrap_err();
        assert!(matches!(err, AppError::ModelInvocation { .. }));
    }

    #[tokio::test]
    async fn test_missing_model_is_configuration_error() {
        let store = Arc::new(FlakyStore::new(FailOn::Nothing, &corpus()).await);
        let service = AnswerService::new(store, AnswerGenerator::from_config(&LlmConfig::default()), 100);

        let err = service.answer("q").await.unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_context_is_bounded() {
        let long = vec![Article::new("Big", "x".repeat(500))];
        let store = Arc::new(FlakyStore::new(FailOn::Nothing, &long).await);
        let model = Arc::new(ScriptedModel::new(Reply::Text("ok".into())));
        let service = AnswerService::new(store, AnswerGenerator::new(model.clone()), 40);

        service.answer("q").await.unwrap();

        let expected = assemble_context(&long, 40);
        assert_eq!(expected.chars().count(), 40);
        assert!(model.prompts()[0].contains(&format!("Context (articles):\n{}\n\nQuestion", expected)));
    }
}
