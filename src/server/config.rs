// 该文件是 Yixiang （医象） 项目的一部分。
// src/server/config.rs - 服务配置
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use clap::Args;

/// 5 MiB
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// 服务参数，命令行优先，其次读取环境变量
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
  /// 监听地址
  #[arg(long, env = "BIND", default_value = "127.0.0.1", value_name = "ADDR")]
  pub bind: String,

  /// 监听端口
  #[arg(short, long, env = "PORT", default_value_t = 5000)]
  pub port: u16,

  /// 上传图像的保存目录
  #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads", value_name = "DIR")]
  pub upload_dir: PathBuf,

  /// 单个上传文件的最大字节数
  #[arg(long, env = "MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE, value_name = "BYTES")]
  pub max_file_size: usize,

  /// 允许跨域访问的前端地址
  #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000", value_name = "ORIGIN")]
  pub cors_origin: String,

  /// 工作线程数，默认与 CPU 核数一致
  #[arg(long, env = "WORKERS")]
  pub workers: Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[derive(Parser)]
  struct Cli {
    #[command(flatten)]
    server: ServerConfig,
  }

  #[test]
  fn defaults_match_documented_values() {
    let cli = Cli::try_parse_from(["yixiang-server"]).unwrap();
    assert_eq!(cli.server.port, 5000);
    assert_eq!(cli.server.upload_dir, PathBuf::from("static/uploads"));
    assert_eq!(cli.server.max_file_size, 5_242_880);
    assert_eq!(cli.server.cors_origin, "http://localhost:3000");
    assert!(cli.server.workers.is_none());
  }

  #[test]
  fn flags_override_defaults() {
    let cli = Cli::try_parse_from([
      "yixiang-server",
      "-p",
      "8080",
      "--upload-dir",
      "/tmp/uploads",
      "--max-file-size",
      "1024",
    ])
    .unwrap();
    assert_eq!(cli.server.port, 8080);
    assert_eq!(cli.server.upload_dir, PathBuf::from("/tmp/uploads"));
    assert_eq!(cli.server.max_file_size, 1024);
  }
}
