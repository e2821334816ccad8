//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

use common::{HtmlTestHelper, TEST_DICTIONARY, TEST_RULES};

/// 在临时目录里准备词典、规则和输入文档
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("ru.ftl"), TEST_DICTIONARY).expect("write dictionary");
    fs::write(dir.path().join("rules.toml"), TEST_RULES).expect("write rules");
    fs::write(
        dir.path().join("index.html"),
        HtmlTestHelper::create_dashboard_page(),
    )
    .expect("write input");
    dir
}

fn localizer_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dom-localizer").expect("binary should be built");
    cmd.current_dir(dir)
        .env_remove("LOCALIZER_DICTIONARY")
        .env_remove("LOCALIZER_RULES")
        .env_remove("LOCALIZER_TARGET_LANG")
        .env("LOCALIZER_LOG_LEVEL", "error")
        .env("NO_COLOR", "1");
    cmd
}

#[cfg(test)]
mod passing {
    use super::*;

    #[test]
    fn writes_localized_document_to_file() {
        let dir = workspace();

        localizer_cmd(dir.path())
            .args([
                "--dictionary",
                "ru.ftl",
                "--rules",
                "rules.toml",
                "-o",
                "out.html",
                "index.html",
            ])
            .assert()
            .success();

        let output = fs::read_to_string(dir.path().join("out.html")).expect("output file");
        assert!(output.contains("Главная"));
        assert!(output.contains("Доброе утро, octocat!"));
        assert!(output.contains("data-ru-localized=\"true\""));
        assert!(output.contains("octocat/Hello-World"));
    }

    #[test]
    fn reads_stdin_and_writes_stdout() {
        let dir = workspace();

        let assert = localizer_cmd(dir.path())
            .args(["-d", "ru.ftl", "-r", "rules.toml", "--quiet"])
            .write_stdin(HtmlTestHelper::create_dashboard_page())
            .assert()
            .success();

        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
        assert!(stdout.contains("Введите"));
        assert!(stdout.contains("<kbd class=\"hx_kbd\">/</kbd>"));
        assert!(assert.get_output().stderr.is_empty());
    }

    #[test]
    fn prints_pass_summary() {
        let dir = workspace();

        let assert = localizer_cmd(dir.path())
            .args(["-d", "ru.ftl", "-r", "rules.toml", "-o", "out.html", "index.html"])
            .assert()
            .success();

        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
        assert!(stderr.contains("passes=1"));
        assert!(stderr.contains("changed=7"));
    }

    #[test]
    fn prints_environment_summary() {
        let dir = workspace();

        let assert = localizer_cmd(dir.path())
            .env("LOCALIZER_DICTIONARY", "ru.ftl")
            .arg("--env-summary")
            .assert()
            .success();

        let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
        assert!(stdout.contains("Dictionary: ru.ftl"));
        assert!(stdout.contains("Rules: [not set]"));
    }

    #[test]
    fn dictionary_from_environment() {
        let dir = workspace();

        localizer_cmd(dir.path())
            .env("LOCALIZER_DICTIONARY", "ru.ftl")
            .env("LOCALIZER_RULES", "rules.toml")
            .args(["-o", "out.html", "index.html"])
            .assert()
            .success();

        let output = fs::read_to_string(dir.path().join("out.html")).expect("output file");
        assert!(output.contains("Главная"));
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use super::*;

    #[test]
    fn missing_dictionary_file() {
        let dir = workspace();

        let assert = localizer_cmd(dir.path())
            .args(["-d", "missing.ftl", "-r", "rules.toml", "index.html"])
            .assert()
            .failure();

        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
        assert!(stderr.contains("Error:"));
        assert!(stderr.contains("missing.ftl"));
    }

    #[test]
    fn no_dictionary_given() {
        let dir = workspace();

        localizer_cmd(dir.path())
            .args(["-r", "rules.toml", "index.html"])
            .assert()
            .failure();
    }

    #[test]
    fn invalid_rule_selector() {
        let dir = workspace();
        fs::write(
            dir.path().join("broken.toml"),
            "[[rules]]\nkind = \"text\"\nselector = \"div >\"\noriginal = \"a\"\nkey = \"b\"\n",
        )
        .expect("write rules");

        localizer_cmd(dir.path())
            .args(["-d", "ru.ftl", "-r", "broken.toml", "-o", "out.html", "index.html"])
            .assert()
            .failure();

        assert!(!dir.path().join("out.html").exists());
    }

    #[test]
    fn invalid_environment_value() {
        let dir = workspace();

        let assert = localizer_cmd(dir.path())
            .env("LOCALIZER_DEBOUNCE_MS", "soon")
            .arg("--env-summary")
            .assert()
            .failure();

        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
        assert!(stderr.contains("LOCALIZER_DEBOUNCE_MS"));
    }

    #[test]
    fn invalid_target_language() {
        let dir = workspace();

        localizer_cmd(dir.path())
            .args(["-d", "ru.ftl", "--lang", "ru_RU", "index.html"])
            .assert()
            .failure();
    }
}
