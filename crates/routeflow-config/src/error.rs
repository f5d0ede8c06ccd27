use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "マニフェストが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: routeflow.local.yaml, .routeflow.local.yaml, routeflow.yaml, .routeflow.yaml\n\
        - ./.routeflow/ ディレクトリ\n\
        - ~/.config/routeflow/routeflow.yaml\n\
        または ROUTEFLOW_MANIFEST 環境変数で直接指定できます"
    )]
    ManifestNotFound,

    #[error("プロファイルの形式が正しくありません ({path}): {source}")]
    InvalidProfile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
