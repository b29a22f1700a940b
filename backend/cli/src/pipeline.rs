//! Knowledge base and lookup wiring shared by the commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use iamgen_config::Settings;
use iamgen_mapping::{KnowledgeBase, LookupService, MappingSource};
use iamgen_policy::{GenerationOptions, PolicyGenerator};

pub struct Pipeline {
    pub settings: Settings,
    pub lookup: Arc<LookupService>,
}

impl Pipeline {
    /// Load every configured mappings directory, in order.
    pub fn load(settings: Settings) -> Result<Self> {
        let kb = KnowledgeBase::new();
        let sources = settings
            .mappings_dirs
            .iter()
            .cloned()
            .map(MappingSource::Directory);
        kb.load(sources)
            .context("Failed to load permission mappings")?;

        let lookup = LookupService::new(Arc::new(kb))
            .with_attribute_mode(settings.generation.attribute_mode);
        Ok(Self {
            settings,
            lookup: Arc::new(lookup),
        })
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        self.lookup.knowledge_base()
    }

    /// A generator over the shared lookup service.
    pub fn generator(&self, options: GenerationOptions) -> PolicyGenerator {
        PolicyGenerator::new(Arc::clone(&self.lookup), options)
    }

    pub fn default_generator(&self) -> PolicyGenerator {
        self.generator(self.settings.generation.to_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iamgen_core::ResourceRecord;
    use std::fs;

    #[test]
    fn loads_configured_dirs_in_order() {
        let base = tempfile::tempdir().unwrap();
        let overrides = tempfile::tempdir().unwrap();
        fs::write(
            base.path().join("s3.yaml"),
            "aws_s3_bucket:\n  service: s3\n  actions:\n    create: s3:CreateBucket\n",
        )
        .unwrap();
        fs::write(
            overrides.path().join("s3.yaml"),
            "aws_s3_bucket:\n  service: s3\n  actions:\n    create:\n      - s3:CreateBucket\n      - s3:PutBucketTagging\n",
        )
        .unwrap();

        let settings = Settings {
            mappings_dirs: vec![base.path().to_path_buf(), overrides.path().to_path_buf()],
            ..Default::default()
        };
        let pipeline = Pipeline::load(settings).unwrap();
        assert_eq!(pipeline.knowledge_base().len(), 1);

        let resources = vec![ResourceRecord::new("aws_s3_bucket", "logs")];
        let (_, metadata) = pipeline
            .default_generator()
            .generate_policy(Some(resources.as_slice()))
            .unwrap();
        assert_eq!(metadata.permission_count, 2);
    }

    #[test]
    fn missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            mappings_dirs: vec![dir.path().join("absent")],
            ..Default::default()
        };
        assert!(Pipeline::load(settings).is_err());
    }
}
