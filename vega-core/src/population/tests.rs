//! End-to-end tests for the population client against a local repository

#[cfg(test)]
mod client_tests {
    use crate::population::{
        Client, Diagnostic, DiagnosticSink, ErrorKind, InstallAction, InstallOptions, ItemKind,
        PopulationConfig, PopulationError, SearchOptions,
    };
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Diagnostic>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<Diagnostic> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DiagnosticSink for RecordingSink {
        fn emit(&self, diagnostic: &Diagnostic) {
            self.events.lock().unwrap().push(diagnostic.clone());
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn manifest(kind: &str, name: &str) -> String {
        format!("kind: {kind}\nname: {name}\nversion: 1.0.0\ndescription: {name} item\n")
    }

    /// Lay out a small repository with two skills, one persona and one profile
    fn populate(repo: &Path) {
        write(
            repo,
            "skills/index.yaml",
            r#"
skills:
  kubernetes-ops:
    version: "1.2.0"
    description: Kubernetes cluster management
    author: platform-team
    tags: [k8s, cluster]
    tools: [kubectl_apply]
  s1:
    version: "1.0.0"
    description: First skill
    tags: [alpha]
  s2:
    version: "1.0.0"
    description: Second skill
    tags: [beta]
"#,
        );
        write(
            repo,
            "personas/index.yaml",
            r#"
personas:
  p1:
    version: "1.0.0"
    description: A kubernetes-savvy operator
    tags: [ops]
"#,
        );
        write(
            repo,
            "profiles/index.yaml",
            r#"
profiles:
  bundle:
    version: "0.1.0"
    description: Ops bundle
    persona: p1
    skills: [s1, s2]
  broken-bundle:
    version: "0.1.0"
    description: References a skill with no manifest
    persona: p1
    skills: [s1, missing-skill]
"#,
        );

        for name in ["kubernetes-ops", "s1", "s2"] {
            write(repo, &format!("skills/{name}/vega.yaml"), &manifest("skill", name));
        }
        write(
            repo,
            "personas/p1/vega.yaml",
            "kind: persona\nname: p1\nversion: 1.0.0\nsystem_prompt: |\n  You are Pat, an operator.\n",
        );
        write(repo, "profiles/bundle/vega.yaml", &manifest("profile", "bundle"));
        write(
            repo,
            "profiles/broken-bundle/vega.yaml",
            &manifest("profile", "broken-bundle"),
        );
    }

    struct Fixture {
        _temp_dir: TempDir,
        install_dir: PathBuf,
        cache_dir: PathBuf,
        client: Client,
        sink: Arc<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        populate(&repo);

        let install_dir = temp_dir.path().join("home/.vega");
        let cache_dir = temp_dir.path().join("home/.vega/cache/population");
        let config = PopulationConfig::for_home(&temp_dir.path().join("home"))
            .with_source(repo.to_str().unwrap());

        let sink = Arc::new(RecordingSink::default());
        let client = Client::new(config).with_sink(sink.clone());

        Fixture {
            _temp_dir: temp_dir,
            install_dir,
            cache_dir,
            client,
            sink,
        }
    }

    fn files_under(dir: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return files;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_install_skill_then_reinstall() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let report = f
            .client
            .install("s1", InstallOptions::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].action, InstallAction::Installed);

        let installed = f.install_dir.join("skills/s1/vega.yaml");
        assert_eq!(
            std::fs::read_to_string(&installed).unwrap(),
            manifest("skill", "s1")
        );

        // Second install without force is a typed failure
        let err = f
            .client
            .install("s1", InstallOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyInstalled);

        // With force it overwrites
        std::fs::write(&installed, "stale").unwrap();
        let force = InstallOptions {
            force: true,
            ..Default::default()
        };
        f.client.install("s1", force, &cancel).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&installed).unwrap(),
            manifest("skill", "s1")
        );
    }

    #[tokio::test]
    async fn test_install_profile_installs_dependencies_first() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let report = f
            .client
            .install("+bundle", InstallOptions::default(), &cancel)
            .await
            .unwrap();

        let order: Vec<_> = report
            .steps
            .iter()
            .map(|s| (s.kind, s.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (ItemKind::Persona, "p1"),
                (ItemKind::Skill, "s1"),
                (ItemKind::Skill, "s2"),
                (ItemKind::Profile, "bundle"),
            ]
        );

        for rel in [
            "personas/p1/vega.yaml",
            "skills/s1/vega.yaml",
            "skills/s2/vega.yaml",
            "profiles/bundle/vega.yaml",
        ] {
            assert!(f.install_dir.join(rel).is_file(), "{rel} missing");
        }
    }

    #[tokio::test]
    async fn test_no_deps_installs_only_the_profile() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let options = InstallOptions {
            no_deps: true,
            ..Default::default()
        };
        let report = f.client.install("+bundle", options, &cancel).await.unwrap();

        assert_eq!(report.steps.len(), 1);
        assert!(!f.install_dir.join("skills/s1").exists());
        assert!(f.install_dir.join("profiles/bundle/vega.yaml").exists());
    }

    #[tokio::test]
    async fn test_present_dependency_is_tolerated() {
        let f = fixture();
        let cancel = CancellationToken::new();

        f.client
            .install("s1", InstallOptions::default(), &cancel)
            .await
            .unwrap();

        let report = f
            .client
            .install("+bundle", InstallOptions::default(), &cancel)
            .await
            .unwrap();

        let s1 = report.steps.iter().find(|s| s.name == "s1").unwrap();
        assert_eq!(s1.action, InstallAction::AlreadyPresent);
        assert_eq!(report.target().unwrap().action, InstallAction::Installed);

        assert_eq!(
            f.sink.events(),
            vec![Diagnostic::DependencyAlreadyInstalled {
                profile: "bundle".to_string(),
                kind: ItemKind::Skill,
                name: "s1".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let options = InstallOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = f.client.install("+bundle", options, &cancel).await.unwrap();

        assert_eq!(report.steps.len(), 4);
        assert!(report
            .steps
            .iter()
            .all(|s| s.action == InstallAction::WouldInstall));

        // Only the index cache may have been written
        let written: Vec<_> = files_under(&f.install_dir)
            .into_iter()
            .filter(|p| !p.starts_with(&f.cache_dir))
            .collect();
        assert!(written.is_empty(), "dry run wrote {written:?}");
    }

    #[tokio::test]
    async fn test_failed_dependency_names_the_dependency() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let err = f
            .client
            .install("+broken-bundle", InstallOptions::default(), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert!(err.to_string().contains("missing-skill"));
        assert!(err.fetch_error().is_some());

        // Earlier dependencies stay installed, the profile itself does not
        assert!(f.install_dir.join("personas/p1/vega.yaml").exists());
        assert!(f.install_dir.join("skills/s1/vega.yaml").exists());
        assert!(!f.install_dir.join("profiles/broken-bundle").exists());
    }

    #[tokio::test]
    async fn test_dependency_names_cannot_escape_install_dir() {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        populate(&repo);
        write(
            &repo,
            "profiles/index.yaml",
            "profiles:\n  escape:\n    version: \"0.1.0\"\n    skills: [s1, \"../../outside\"]\n",
        );
        write(&repo, "profiles/escape/vega.yaml", &manifest("profile", "escape"));
        write(&repo, "outside/vega.yaml", &manifest("skill", "outside"));

        let home = temp_dir.path().join("home");
        let install_dir = home.join(".vega");
        let client = Client::new(
            PopulationConfig::for_home(&home).with_source(repo.to_str().unwrap()),
        );
        let cancel = CancellationToken::new();

        let err = client
            .install("+escape", InstallOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert!(err.to_string().contains("../../outside"));
        match &err {
            PopulationError::Dependency { source, .. } => {
                assert_eq!(source.kind(), ErrorKind::InvalidName)
            }
            other => panic!("expected dependency error, got {other:?}"),
        }

        // Rejected before any dependency was written
        assert!(!install_dir.join("skills/s1").exists());
        assert!(!home.join("outside").exists());
        assert!(!install_dir.join("profiles/escape").exists());

        // Bare names from the command line are checked the same way
        for name in ["@", "../x", "+a/b"] {
            let err = client
                .install(name, InstallOptions::default(), &cancel)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidName, "{name}");

            let err = client.info(name, &cancel).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidName, "{name}");
        }
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let err = f
            .client
            .install("+nope", InstallOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_search_across_kinds() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let results = f
            .client
            .search("kubernetes", &SearchOptions::default(), &cancel)
            .await
            .unwrap();

        let scored: Vec<_> = results
            .iter()
            .map(|r| (r.kind, r.name.as_str(), r.score))
            .collect();
        assert_eq!(
            scored,
            vec![
                (ItemKind::Skill, "kubernetes-ops", 0.8),
                (ItemKind::Persona, "p1", 0.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_search_tag_filter_and_kind() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let options = SearchOptions {
            tags: vec!["K8S".to_string()],
            ..Default::default()
        };
        let results = f.client.search("s", &options, &cancel).await.unwrap();
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["kubernetes-ops"]);

        let options = SearchOptions {
            kind: Some(ItemKind::Profile),
            ..Default::default()
        };
        let results = f.client.search("s1", &options, &cancel).await.unwrap();
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["broken-bundle", "bundle"]);
    }

    #[tokio::test]
    async fn test_info_reports_install_state() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let info = f.client.info("+bundle", &cancel).await.unwrap();
        assert_eq!(info.kind, ItemKind::Profile);
        assert_eq!(info.persona.as_deref(), Some("p1"));
        assert_eq!(info.skills, vec!["s1", "s2"]);
        assert!(!info.is_installed());

        f.client
            .install("kubernetes-ops", InstallOptions::default(), &cancel)
            .await
            .unwrap();
        let info = f.client.info("kubernetes-ops", &cancel).await.unwrap();
        assert_eq!(info.tools, vec!["kubectl_apply"]);
        assert_eq!(
            info.installed_path,
            Some(f.install_dir.join("skills/kubernetes-ops"))
        );

        let err = f.client.info("@ghost", &cancel).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_after_install() {
        let f = fixture();
        let cancel = CancellationToken::new();

        f.client
            .install("+bundle", InstallOptions::default(), &cancel)
            .await
            .unwrap();

        let all = f.client.list(None).unwrap();
        let names: Vec<_> = all.iter().map(|i| (i.kind, i.name.as_str())).collect();
        assert_eq!(
            names,
            vec![
                (ItemKind::Skill, "s1"),
                (ItemKind::Skill, "s2"),
                (ItemKind::Persona, "p1"),
                (ItemKind::Profile, "bundle"),
            ]
        );

        let skills = f.client.list(Some(ItemKind::Skill)).unwrap();
        assert_eq!(skills.len(), 2);
    }

    #[tokio::test]
    async fn test_manifest_for_export() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let manifest = f.client.manifest("@p1", &cancel).await.unwrap();
        assert_eq!(manifest.system_prompt, "You are Pat, an operator.\n");
    }

    #[tokio::test]
    async fn test_update_cache_repopulates_every_index() {
        let f = fixture();
        let cancel = CancellationToken::new();

        std::fs::create_dir_all(&f.cache_dir).unwrap();
        std::fs::write(f.cache_dir.join("stale-entry"), "old").unwrap();

        f.client.update_cache(&cancel).await.unwrap();

        let mut cached: Vec<_> = std::fs::read_dir(&f.cache_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        cached.sort();
        assert_eq!(
            cached,
            vec![
                "personas-index.yaml",
                "profiles-index.yaml",
                "skills-index.yaml"
            ]
        );
    }

    #[tokio::test]
    async fn test_cache_write_failure_is_reported_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        populate(&repo);

        // A regular file where the cache directory's parent should be
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let config = PopulationConfig::for_home(temp_dir.path())
            .with_source(repo.to_str().unwrap())
            .with_cache_dir(blocker.join("cache"));
        let sink = Arc::new(RecordingSink::default());
        let client = Client::new(config).with_sink(sink.clone());

        let options = SearchOptions {
            kind: Some(ItemKind::Skill),
            ..Default::default()
        };
        let results = client
            .search("s1", &options, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let Diagnostic::CacheWriteFailed { key, path, message } = &events[0] else {
            panic!("expected cache write failure, got {:?}", events[0]);
        };
        assert_eq!(key, "skills-index.yaml");
        assert_eq!(path, &blocker.join("cache"));

        // The message carries the underlying io error, not just the path
        let io_error = std::fs::create_dir_all(blocker.join("cache")).unwrap_err();
        assert_eq!(
            message,
            &format!(
                "Failed to write cache entry {}: {io_error}",
                blocker.join("cache").display()
            )
        );
    }

    #[tokio::test]
    async fn test_disabled_cache_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        populate(&repo);

        let config = PopulationConfig::for_home(temp_dir.path())
            .with_source(repo.to_str().unwrap())
            .without_cache();
        let cache_dir = config.cache_dir.clone();
        let client = Client::new(config);

        client
            .search("s1", &SearchOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!cache_dir.exists());
    }
}
