use std::{
  fmt,
  path::{Path, PathBuf},
  process::Command,
  time::Duration,
};

use anyhow::{Context, Result};

use crate::{cancel::Cancel, ext::CommandExt};

/// Paths to the benchmark suites and to every tool a runner invokes.
#[derive(Clone, Debug)]
pub struct Toolchain {
  pub defrac_benchmarks: PathBuf,
  pub ton80_benchmarks: PathBuf,
  pub defrac: PathBuf,
  pub java: PathBuf,
  pub dart: PathBuf,
  pub dart2js: PathBuf,
  pub d8: PathBuf,
  pub js: PathBuf,
}

impl Toolchain {
  /// `<ton80>/lib/src/<benchmark>/dart/<benchmark>.dart`
  fn dart_source(&self, benchmark: &str) -> PathBuf {
    self.ton80_src(benchmark).join("dart").join(format!("{benchmark}.dart"))
  }

  fn dart2js_output(&self, benchmark: &str) -> PathBuf {
    self.ton80_src(benchmark).join("dart").join(format!("{benchmark}.dart.js"))
  }

  fn js_source(&self, benchmark: &str) -> PathBuf {
    self.ton80_src(benchmark).join("javascript").join(format!("{benchmark}.js"))
  }

  fn js_harness(&self) -> PathBuf {
    self.ton80_src("common").join("javascript").join("bench.js")
  }

  fn ton80_src(&self, dir: &str) -> PathBuf {
    self.ton80_benchmarks.join("lib").join("src").join(dir)
  }

  fn defrac_target(&self) -> PathBuf {
    self.defrac_benchmarks.join("target")
  }

  fn defrac_app_js(&self) -> PathBuf {
    self.defrac_target().join("web").join("defrac.benchmark").join("app.js")
  }
}

/// Every way a benchmark can be executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Runner {
  Dart,
  Dart2JsV8,
  Dart2JsSpiderMonkey,
  JsV8,
  JsSpiderMonkey,
  DefracJvm,
  DefracV8,
  DefracSpiderMonkey,
  DefracLinux,
}

impl Runner {
  pub fn name(self) -> &'static str {
    match self {
      Runner::Dart => "dart",
      Runner::Dart2JsV8 => "dart2js:v8",
      Runner::Dart2JsSpiderMonkey => "dart2js:sM",
      Runner::JsV8 => "js:v8",
      Runner::JsSpiderMonkey => "js:sM",
      Runner::DefracJvm => "defrac:jvm",
      Runner::DefracV8 => "defrac:v8",
      Runner::DefracSpiderMonkey => "defrac:sM",
      Runner::DefracLinux => "defrac:c++",
    }
  }

  /// The command whose stdout contains the timing of one run of `benchmark`.
  pub fn command(self, toolchain: &Toolchain, benchmark: &str) -> Command {
    match self {
      Runner::Dart => {
        let mut command = Command::new(&toolchain.dart);
        command.arg(toolchain.dart_source(benchmark));
        command
      }
      Runner::Dart2JsV8 => shell(&toolchain.d8, [toolchain.dart2js_output(benchmark)]),
      Runner::Dart2JsSpiderMonkey => shell(&toolchain.js, [toolchain.dart2js_output(benchmark)]),
      Runner::JsV8 => shell(&toolchain.d8, [toolchain.js_harness(), toolchain.js_source(benchmark)]),
      Runner::JsSpiderMonkey => shell(&toolchain.js, [toolchain.js_harness(), toolchain.js_source(benchmark)]),
      Runner::DefracJvm => {
        let mut command = Command::new(&toolchain.java);
        command
          .arg("-cp")
          .arg(toolchain.defrac_target().join("jvm"))
          .arg(format!("defrac.benchmark.{benchmark}"));
        command
      }
      Runner::DefracV8 => shell(&toolchain.d8, [toolchain.defrac_app_js()]),
      Runner::DefracSpiderMonkey => shell(&toolchain.js, [toolchain.defrac_app_js()]),
      Runner::DefracLinux => Command::new(toolchain.defrac_target().join("linux").join("app")),
    }
  }
}

/// A JavaScript shell (`d8` or SpiderMonkey's `js`) loading each file with `-f`.
fn shell<const N: usize>(bin: &Path, files: [PathBuf; N]) -> Command {
  let mut command = Command::new(bin);
  for file in files {
    command.arg("-f").arg(file);
  }

  command
}

/// A defrac compilation target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Platform {
  Jvm,
  Web,
  Linux,
}

impl Platform {
  /// The native target is only available when benchmarking on Linux.
  pub fn defaults() -> Vec<Platform> {
    if cfg!(target_os = "linux") {
      vec![Platform::Jvm, Platform::Web, Platform::Linux]
    } else {
      vec![Platform::Jvm, Platform::Web]
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Platform::Jvm => "jvm",
      Platform::Web => "web",
      Platform::Linux => "linux",
    }
  }

  pub fn runners(self) -> &'static [Runner] {
    match self {
      Platform::Jvm => &[Runner::DefracJvm],
      Platform::Web => &[Runner::DefracV8, Runner::DefracSpiderMonkey],
      Platform::Linux => &[Runner::DefracLinux],
    }
  }
}

/// Work that must succeed before any runner of a group can be measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setup {
  None,
  Dart2Js,
  Defrac(Platform),
}

impl fmt::Display for Setup {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Setup::None => write!(f, "none"),
      Setup::Dart2Js => write!(f, "dart2js"),
      Setup::Defrac(platform) => write!(f, "defrac {}", platform.name()),
    }
  }
}

impl Setup {
  /// The commands to run, in order.
  pub fn commands(self, toolchain: &Toolchain, benchmark: &str) -> Vec<Command> {
    match self {
      Setup::None => vec![],
      Setup::Dart2Js => {
        let mut command = Command::new(&toolchain.dart2js);
        command
          .arg("-o")
          .arg(toolchain.dart2js_output(benchmark))
          .arg(toolchain.dart_source(benchmark));
        vec![command]
      }
      Setup::Defrac(platform) => {
        let p = platform.name();
        [
          format!("{p}:clean"),
          format!("{p}:config debug false"),
          format!("{p}:config strictMode false"),
          format!("{p}:config main defrac.benchmark.{benchmark}"),
          format!("{p}:compile"),
        ]
        .into_iter()
        .map(|task| {
          let mut command = Command::new(&toolchain.defrac);
          command.arg("-p").arg(&toolchain.defrac_benchmarks).arg(task);
          command
        })
        .collect()
      }
    }
  }

  pub fn run(self, toolchain: &Toolchain, benchmark: &str, executor: &Executor) -> Result<()> {
    for mut command in self.commands(toolchain, benchmark) {
      executor
        .capture(&mut command)
        .with_context(|| format!("{command:?}"))?;
    }

    Ok(())
  }
}

/// Runners that share a setup step.
#[derive(Clone, Copy, Debug)]
pub struct Group {
  pub setup: Setup,
  pub runners: &'static [Runner],
}

/// Groups in sweep order: dart, dart2js, plain js, then each defrac platform.
pub fn groups(platforms: &[Platform]) -> Vec<Group> {
  let mut groups = vec![
    Group {
      setup: Setup::None,
      runners: &[Runner::Dart],
    },
    Group {
      setup: Setup::Dart2Js,
      runners: &[Runner::Dart2JsV8, Runner::Dart2JsSpiderMonkey],
    },
    Group {
      setup: Setup::None,
      runners: &[Runner::JsV8, Runner::JsSpiderMonkey],
    },
  ];

  groups.extend(platforms.iter().map(|&platform| Group {
    setup: Setup::Defrac(platform),
    runners: platform.runners(),
  }));

  groups
}

/// Runs child processes on behalf of runners and setup steps.
#[derive(Clone)]
pub struct Executor {
  pub cancel: Cancel,
  pub timeout: Option<Duration>,
}

impl Executor {
  pub fn new(cancel: Cancel, timeout: Option<Duration>) -> Self {
    Self { cancel, timeout }
  }

  pub fn capture(&self, command: &mut Command) -> Result<String> {
    command.capture(&self.cancel, self.timeout)
  }

  /// Executes `runner` on `benchmark` and returns its stdout.
  pub fn stdout_of(&self, toolchain: &Toolchain, runner: Runner, benchmark: &str) -> Result<String> {
    let mut command = runner.command(toolchain, benchmark);

    self
      .capture(&mut command)
      .with_context(|| format!("{} {benchmark}", runner.name()))
  }
}

#[cfg(test)]
mod tests {
  use std::ffi::OsStr;

  use super::*;

  fn toolchain() -> Toolchain {
    Toolchain {
      defrac_benchmarks: "/defrac-bench".into(),
      ton80_benchmarks: "/ton80".into(),
      defrac: "defrac".into(),
      java: "java".into(),
      dart: "dart".into(),
      dart2js: "dart2js".into(),
      d8: "d8".into(),
      js: "js".into(),
    }
  }

  fn argv(command: &Command) -> Vec<&str> {
    std::iter::once(command.get_program())
      .chain(command.get_args())
      .map(|arg| arg.to_str().unwrap())
      .collect()
  }

  #[test]
  fn runner_commands() {
    let toolchain = toolchain();
    let argv_of = |runner: Runner| argv(&runner.command(&toolchain, "Richards")).join(" ");

    assert_eq!(argv_of(Runner::Dart), "dart /ton80/lib/src/Richards/dart/Richards.dart");
    assert_eq!(argv_of(Runner::Dart2JsV8), "d8 -f /ton80/lib/src/Richards/dart/Richards.dart.js");
    assert_eq!(
      argv_of(Runner::Dart2JsSpiderMonkey),
      "js -f /ton80/lib/src/Richards/dart/Richards.dart.js"
    );
    assert_eq!(
      argv_of(Runner::JsV8),
      "d8 -f /ton80/lib/src/common/javascript/bench.js -f /ton80/lib/src/Richards/javascript/Richards.js"
    );
    assert_eq!(
      argv_of(Runner::DefracJvm),
      "java -cp /defrac-bench/target/jvm defrac.benchmark.Richards"
    );
    assert_eq!(
      argv_of(Runner::DefracSpiderMonkey),
      "js -f /defrac-bench/target/web/defrac.benchmark/app.js"
    );
    assert_eq!(argv_of(Runner::DefracLinux), "/defrac-bench/target/linux/app");
  }

  #[test]
  fn setup_commands() {
    let toolchain = toolchain();

    assert!(Setup::None.commands(&toolchain, "Havlak").is_empty());

    let dart2js = Setup::Dart2Js.commands(&toolchain, "Havlak");
    assert_eq!(
      argv(&dart2js[0]).join(" "),
      "dart2js -o /ton80/lib/src/Havlak/dart/Havlak.dart.js /ton80/lib/src/Havlak/dart/Havlak.dart"
    );

    let defrac = Setup::Defrac(Platform::Web).commands(&toolchain, "Havlak");
    let tasks: Vec<_> = defrac.iter().map(|command| argv(command)[3]).collect();
    assert_eq!(
      tasks,
      [
        "web:clean",
        "web:config debug false",
        "web:config strictMode false",
        "web:config main defrac.benchmark.Havlak",
        "web:compile",
      ]
    );
    assert_eq!(defrac[0].get_args().nth(1), Some(OsStr::new("/defrac-bench")));
  }

  #[cfg(unix)]
  #[test]
  fn setup_killed_by_interrupt_is_not_a_failure() {
    use std::{fs, os::unix::fs::PermissionsExt};

    use crate::cancel::is_interrupted;

    let dir = tempfile::tempdir().unwrap();
    let dart2js = dir.path().join("dart2js");
    fs::write(&dart2js, "#!/bin/sh\nkill -INT $$\n").unwrap();
    fs::set_permissions(&dart2js, fs::Permissions::from_mode(0o755)).unwrap();

    let toolchain = Toolchain { dart2js, ..toolchain() };
    let cancel = Cancel::new();
    cancel.cancel();

    let err = Setup::Dart2Js
      .run(&toolchain, "Richards", &Executor::new(cancel, None))
      .unwrap_err();
    assert!(is_interrupted(&err), "{err:?}");
  }

  #[test]
  fn runner_names_are_unique() {
    let mut names: Vec<_> = groups(&[Platform::Jvm, Platform::Web, Platform::Linux])
      .iter()
      .flat_map(|group| group.runners)
      .map(|runner| runner.name())
      .collect();
    assert_eq!(names.len(), 9);

    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 9);
  }

  #[test]
  fn groups_follow_platforms() {
    let groups = groups(&[Platform::Jvm]);
    assert_eq!(groups.len(), 4);
    assert_eq!(groups[1].setup, Setup::Dart2Js);
    assert_eq!(groups[3].setup, Setup::Defrac(Platform::Jvm));
    assert_eq!(groups[3].runners, &[Runner::DefracJvm]);
  }
}
