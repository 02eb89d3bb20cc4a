#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cloudsketch_core::settings::Invocation;
use cloudsketch_runner::{CommandRunner, QCli, ScriptExecutor};

/// Reads the `filename="..."` (or `savefig("....png"`) out of a generated
/// script and creates that PNG, the way the diagrams library would.
const FAKE_PYTHON: &str = r#"script="$1"
case "$(cat "$script")" in
  *FAIL_SCRIPT*) echo "Traceback: boom" >&2; exit 1 ;;
esac
stem=$(sed -n 's/.*filename="\([^"]*\)".*/\1/p' "$script" | head -n 1)
if [ -z "$stem" ]; then
  stem=$(sed -n 's/.*savefig("\([^"]*\)\.png".*/\1/p' "$script" | head -n 1)
fi
[ -n "$stem" ] || exit 0
: > "$stem.png"
"#;

pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn diagrams(&self) -> PathBuf {
        self.dir.path().join("generated-diagrams")
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    /// Executor running scripts through `sh`.
    pub fn shell_executor(&self, timeout: Duration) -> ScriptExecutor {
        ScriptExecutor::new(self.diagrams(), "sh").with_timeout(timeout)
    }

    /// Executor that "renders" Python diagram scripts by touching their PNG.
    pub fn fake_python(&self) -> Arc<ScriptExecutor> {
        let script = self.write("fake_python.sh", FAKE_PYTHON);
        Arc::new(
            ScriptExecutor::new(self.diagrams(), "sh")
                .with_args(vec![script.display().to_string()])
                .with_timeout(Duration::from_secs(10)),
        )
    }

    /// Executor whose interpreter always fails.
    pub fn broken_python(&self) -> Arc<ScriptExecutor> {
        Arc::new(
            ScriptExecutor::new(self.diagrams(), "sh")
                .with_args(vec!["-c".into(), "echo nope >&2; exit 1".into()]),
        )
    }

    /// CLI stand-in: `sh <body-file> chat`, prompt on stdin.
    pub fn fake_cli(&self, body: &str, timeout: Duration) -> QCli {
        let script = self.write("fake_q.sh", body);
        let runner = CommandRunner::Native {
            program: PathBuf::from("sh"),
            args: vec![script.display().to_string()],
        };
        QCli::new(runner, Invocation::Pipe, timeout)
    }

    pub fn leftover_scripts(&self) -> Vec<PathBuf> {
        list(&self.diagrams(), |name| {
            name.starts_with("cloudsketch_script_") && name.ends_with(".py")
        })
    }

    pub fn pngs(&self) -> Vec<PathBuf> {
        list(&self.diagrams(), |name| name.ends_with(".png"))
    }
}

fn list(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| keep(n))
        })
        .collect();
    found.sort();
    found
}
