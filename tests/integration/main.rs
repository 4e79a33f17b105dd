//! Integration tests for Scarlet

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn scarlet() -> Command {
        cargo_bin_cmd!("scarlet")
    }

    /// A config, cache directory and world directory isolated in a temp dir
    struct Sandbox {
        dir: TempDir,
        config: PathBuf,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            fs::create_dir_all(root.join("worlds")).unwrap();

            fs::write(
                root.join("colors.toml"),
                "[0]\nr = 0\ng = 0\nb = 0\n\n[1]\nr = 255\ng = 0\nb = 0\n\n[2]\nr = 0\ng = 0\nb = 255\n",
            )
            .unwrap();
            fs::write(
                root.join("worlds").join("PW01.json"),
                r#"{"width":3,"height":2,"blocks":[0,1,2,2,1,0],"name":"Lobby","owner":"ada","plays":7}"#,
            )
            .unwrap();

            let config = root.join("config.toml");
            fs::write(
                &config,
                format!(
                    "[cache]\ndir = '{}'\n\n[provider]\nworlds_dir = '{}'\ncolors_path = '{}'\n",
                    root.join("cache").display(),
                    root.join("worlds").display(),
                    root.join("colors.toml").display(),
                ),
            )
            .unwrap();

            Self { dir, config }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn cmd(&self) -> Command {
            let mut cmd = scarlet();
            cmd.env("SCARLET_CONFIG", &self.config);
            cmd
        }
    }

    fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
        let reader = png::Decoder::new(bytes).read_info().unwrap();
        (reader.info().width, reader.info().height)
    }

    #[test]
    fn help_displays() {
        scarlet()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached world minimaps"));
    }

    #[test]
    fn version_displays() {
        scarlet()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("scarlet"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]").and(predicate::str::contains("ttl_secs")));
    }

    #[test]
    fn config_init_respects_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scarlet").join("config.toml");

        scarlet()
            .env("SCARLET_CONFIG", &path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(path.exists());

        scarlet()
            .env("SCARLET_CONFIG", &path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nttl_secs = \"never\"\n").unwrap();

        scarlet()
            .env("SCARLET_CONFIG", &path)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));

        scarlet()
            .env("SCARLET_CONFIG", &path)
            .args(["config", "init", "--force"])
            .assert()
            .success();
    }

    #[test]
    fn render_writes_png() {
        let sandbox = Sandbox::new();
        let out = sandbox.path().join("PW01.png");

        sandbox
            .cmd()
            .args(["render", "PW01", "--scale", "2", "-o"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("Rendered PW01 at scale 2"));

        let bytes = fs::read(&out).unwrap();
        assert_eq!(png_dimensions(&bytes), (6, 4));
    }

    #[test]
    fn render_to_stdout() {
        let sandbox = Sandbox::new();
        let output = sandbox
            .cmd()
            .args(["render", "PW01", "-o", "-"])
            .output()
            .unwrap();

        assert!(output.status.success());
        assert_eq!(png_dimensions(&output.stdout), (3, 2));
    }

    #[test]
    fn render_clamps_scale() {
        let sandbox = Sandbox::new();
        let out = sandbox.path().join("big.png");

        sandbox
            .cmd()
            .args(["render", "PW01", "--scale", "50", "-o"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("at scale 4"));

        assert_eq!(png_dimensions(&fs::read(&out).unwrap()), (12, 8));
    }

    #[test]
    fn render_missing_world() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["render", "nowhere", "-o"])
            .arg(sandbox.path().join("x.png"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("World not found"));
    }

    #[test]
    fn meta_prints_document() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["meta", "PW01"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"name\": \"Lobby\""))
            .stdout(predicate::str::contains("\"plays\": 7"));
    }

    #[test]
    fn colors_lists_palette() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["colors", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 #ff0000ff"))
            .stdout(predicate::str::contains("2 #0000ffff"));

        sandbox
            .cmd()
            .args(["colors", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"hex\": \"#000000ff\""));

        sandbox
            .cmd()
            .arg("colors")
            .assert()
            .success()
            .stdout(predicate::str::contains("Total: 3 colors"));
    }

    #[test]
    fn colors_without_palette() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[provider]\nfetch_timeout_secs = 5\n").unwrap();

        scarlet()
            .env("SCARLET_CONFIG", &path)
            .arg("colors")
            .assert()
            .success()
            .stdout(predicate::str::contains("No colors configured."));
    }

    #[test]
    fn update_then_cache_listing() {
        let sandbox = Sandbox::new();
        let out = sandbox.path().join("PW01.png");

        sandbox
            .cmd()
            .args(["render", "PW01", "-o"])
            .arg(&out)
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("local.[PW01]\n"))
            .stdout(predicate::str::contains("local.[PW01].minimap.[1]"));

        sandbox
            .cmd()
            .args(["update", "PW01"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Expired cached data for PW01"));

        // Expired entries stay listed until replaced
        sandbox
            .cmd()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("expired"));
    }

    #[test]
    fn cache_clear_empties_listing() {
        let sandbox = Sandbox::new();
        sandbox.cmd().args(["meta", "PW01"]).assert().success();

        sandbox
            .cmd()
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 2 cache entries"));

        sandbox
            .cmd()
            .args(["cache", "list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn cache_list_without_directory() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries found."));
    }
}
