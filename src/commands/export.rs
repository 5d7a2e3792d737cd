use crate::cli::ExportArgs;
use crate::export::export;
use crate::fs::{FileSystem, default_fs};
use crate::style;

use super::{load_spec, write_output};

pub fn cmd_export(args: ExportArgs) -> i32 {
    cmd_export_with_fs(args, default_fs())
}

pub fn cmd_export_with_fs(args: ExportArgs, fs: &dyn FileSystem) -> i32 {
    let spec = match load_spec(&args.spec, fs) {
        Ok(spec) => spec,
        Err(code) => return code,
    };

    let content = match export(&spec, args.to) {
        Ok(content) => content,
        Err(e) => {
            style::error(&e.to_string());
            return 1;
        }
    };

    let code = write_output(args.output.as_deref(), &content, false, fs);
    if code == 0
        && let Some(path) = &args.output
    {
        style::success(&format!("Exported {} to {}", args.to, style::path(path)));
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use crate::fs::mock::MockFs;
    use std::path::PathBuf;

    #[test]
    fn test_export_d2_to_file() {
        let fs = MockFs::with_files([(
            "/e/arch.yaml",
            "name: Edge\ncomponents:\n  - {id: cdn, service: cloudfront, provider: aws, label: CDN, tier: 0}\n",
        )]);
        let args = ExportArgs {
            spec: PathBuf::from("/e/arch.yaml"),
            to: ExportFormat::D2,
            output: Some(PathBuf::from("/e/arch.d2")),
        };
        assert_eq!(cmd_export_with_fs(args, &fs), 0);
        let out = &fs.files()["/e/arch.d2"];
        assert!(out.starts_with("# Edge\n"));
        assert!(out.contains("cdn: \"CDN [AWS]\""));
    }

    #[test]
    fn test_export_invalid_spec() {
        let fs = MockFs::with_files([(
            "/e/bad.yaml",
            "name: Bad\ncomponents:\n  - {id: 1st, service: ec2, provider: aws, label: X}\n",
        )]);
        let args = ExportArgs {
            spec: PathBuf::from("/e/bad.yaml"),
            to: ExportFormat::Mermaid,
            output: Some(PathBuf::from("/e/out.mmd")),
        };
        assert_eq!(cmd_export_with_fs(args, &fs), 1);
        assert!(!fs.files().contains_key("/e/out.mmd"));
    }
}
