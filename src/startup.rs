use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task;
use tracing::info;

use crate::catalog::{LawyerCatalog, OffenseCatalog};
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::offense_matcher::OffenseMatcher;
use crate::session::Session;
use crate::translate::Translator;

/// Everything loaded once per process.
pub struct Engine {
    pub offenses: Arc<OffenseMatcher>,
    pub lawyers: Arc<LawyerCatalog>,
}

impl Engine {
    /// Loads both catalogs and the embedding model concurrently on blocking
    /// threads. Any failure aborts startup.
    pub async fn load(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let offenses_path = settings.offenses_path.clone();
        let lawyers_path = settings.lawyers_path.clone();
        let model = settings.model;
        let cache_dir = settings.cache_dir.clone();

        let (offenses, lawyers, embedder) = tokio::try_join!(
            task::spawn_blocking(move || OffenseCatalog::load(offenses_path)),
            task::spawn_blocking(move || LawyerCatalog::load(lawyers_path)),
            task::spawn_blocking(move || model.build(cache_dir)),
        )
        .context("Startup task panicked")?;

        let offenses = offenses.context("Failed to load offense catalog")?;
        let lawyers = lawyers.context("Failed to load lawyer catalog")?;
        let embedder: Arc<dyn Embedder> =
            Arc::from(embedder.context("Failed to initialize embedding model")?);

        info!(
            "Engine ready: {} offenses, {} lawyers, model {}",
            offenses.len(),
            lawyers.len(),
            embedder.model_id()
        );

        let matcher =
            OffenseMatcher::new(Arc::new(offenses), embedder).with_min_score(settings.min_score);
        Ok(Self {
            offenses: Arc::new(matcher),
            lawyers: Arc::new(lawyers),
        })
    }

    /// Embeds the offense catalog now so the first question is not slow.
    pub async fn warm_up(&self) -> Result<()> {
        let matcher = Arc::clone(&self.offenses);
        task::spawn_blocking(move || matcher.warm_up())
            .await
            .context("Warm-up task panicked")?
            .context("Failed to embed offense catalog")?;
        Ok(())
    }

    pub fn session(&self, translator: Arc<dyn Translator>, settings: &Settings) -> Session {
        Session::new(
            Arc::clone(&self.offenses),
            Arc::clone(&self.lawyers),
            translator,
            settings.language,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedderKind;
    use crate::error::LoadError;
    use crate::translate::PassthroughTranslator;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir) -> Result<Settings> {
        let offenses = dir.path().join("ipc.csv");
        fs::write(
            &offenses,
            "IPC Section,Offense,Punishment,Cognizable,Bailable,Court\n\
             IPC_302,Murder,Death,Yes,No,Court of Session\n\
             IPC_379,Theft,3 Years,Yes,No,Any Magistrate\n",
        )?;
        let lawyers = dir.path().join("lawyers.csv");
        fs::write(
            &lawyers,
            "Name,Address,Phone No\nR. Gupta,\"Connaught Place, New Delhi\",98110 00002\n",
        )?;

        Ok(Settings {
            offenses_path: offenses,
            lawyers_path: lawyers,
            model: EmbedderKind::Hash,
            cache_dir: None,
            ..Settings::default()
        })
    }

    #[tokio::test]
    async fn test_engine_load_and_session() -> Result<()> {
        let dir = TempDir::new()?;
        let settings = fixture(&dir)?;

        let engine = Engine::load(&settings).await?;
        engine.warm_up().await?;
        let mut session = engine.session(Arc::new(PassthroughTranslator), &settings);

        let view = session.ask("Murder")?.expect("murder should match");
        assert_eq!(view.ipc_section, "IPC_302");
        let lawyer = session.find_lawyer("delhi")?.expect("delhi should match");
        assert_eq!(lawyer.name, "R. Gupta");
        assert_eq!(session.history().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_engine_fails_fast_on_missing_catalog() -> Result<()> {
        let dir = TempDir::new()?;
        let settings = Settings {
            lawyers_path: PathBuf::from("/no/such/lawyers.csv"),
            ..fixture(&dir)?
        };

        let err = match Engine::load(&settings).await {
            Ok(_) => panic!("expected startup to fail"),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::FileNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_engine_rejects_invalid_settings() -> Result<()> {
        let dir = TempDir::new()?;
        let settings = Settings {
            min_score: 2.0,
            ..fixture(&dir)?
        };
        assert!(Engine::load(&settings).await.is_err());
        Ok(())
    }
}
