use clap::Parser;
use cloudwright::cli::{Cli, Command};
use cloudwright::{
    cmd_analyze, cmd_diff, cmd_drift, cmd_export, cmd_history, cmd_init, cmd_layout, cmd_lint,
    cmd_policy, cmd_validate, cmd_version,
};

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Command::Validate(args) => cmd_validate(args),
        Command::Analyze(args) => cmd_analyze(args),
        Command::Diff(args) => cmd_diff(args),
        Command::Drift(args) => cmd_drift(args),
        Command::Layout(args) => cmd_layout(args),
        Command::Lint(args) => cmd_lint(args),
        Command::Policy(args) => cmd_policy(args),
        Command::Export(args) => cmd_export(args),
        Command::Version(args) => cmd_version(args),
        Command::History(args) => cmd_history(args),
        Command::Init(args) => cmd_init(args),
    };

    std::process::exit(exit_code);
}
