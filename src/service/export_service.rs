//! 充值地址申请导出（xlsx）

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::repository::WalletRequestView;

const HEADERS: [&str; 9] = [
    "Request ID",
    "Email",
    "Name",
    "Coin",
    "Asset ID",
    "Wallet Address",
    "Status",
    "No. of Coins",
    "Created At",
];

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportSummary {
    pub path: String,
    pub rows: usize,
}

pub fn export_file_path(dir: &Path, user_id: Uuid) -> PathBuf {
    dir.join(format!("wallet-requests-{}.xlsx", user_id))
}

/// 写出工作簿，返回数据行数（不含表头）
pub fn write_workbook(path: &Path, rows: &[WalletRequestView]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export dir {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Wallet Requests")?;

    for (col, title) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (i, view) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        let req = &view.request;
        let name = [view.user.first_name.as_deref(), view.user.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        sheet.write_string(row, 0, req.id.to_string())?;
        sheet.write_string(row, 1, view.user.email.as_str())?;
        sheet.write_string(row, 2, name)?;
        sheet.write_string(row, 3, req.coin.as_str())?;
        sheet.write_string(row, 4, req.asset_id.as_str())?;
        sheet.write_string(row, 5, req.wallet_address.as_str())?;
        sheet.write_string(row, 6, req.status.as_str())?;
        sheet.write_string(row, 7, req.no_of_coins.to_string())?;
        sheet.write_string(row, 8, req.created_at.to_rfc3339())?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(rows.len())
}

/// 在阻塞线程池中写文件
pub async fn export_user_requests(
    dir: &Path,
    user_id: Uuid,
    rows: Vec<WalletRequestView>,
) -> Result<ExportSummary> {
    let path = export_file_path(dir, user_id);
    let target = path.clone();
    let written = tokio::task::spawn_blocking(move || write_workbook(&target, &rows))
        .await
        .context("export task panicked")??;

    tracing::info!(user_id = %user_id, rows = written, path = %path.display(), "wallet requests exported");

    Ok(ExportSummary {
        path: path.display().to_string(),
        rows: written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::WalletRequestStatus,
        repository::{wallet_request_repository::initial_no_of_coins, UserProfile, WalletAddressRequest},
    };

    fn view(user_id: Uuid) -> WalletRequestView {
        WalletRequestView {
            request: WalletAddressRequest {
                id: Uuid::new_v4(),
                user_id,
                coin: "BTC".into(),
                asset_id: "BTC_TEST".into(),
                wallet_address: "tb1qxyz".into(),
                status: WalletRequestStatus::Completed,
                no_of_coins: initial_no_of_coins(),
                comment: None,
                history: vec![],
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            user: UserProfile {
                id: user_id,
                email: "u1@example.com".into(),
                first_name: Some("Ada".into()),
                last_name: Some("Lovelace".into()),
            },
        }
    }

    #[tokio::test]
    async fn test_export_writes_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let user_id = Uuid::new_v4();

        let summary = export_user_requests(dir.path(), user_id, vec![view(user_id), view(user_id)])
            .await
            .unwrap();

        assert_eq!(summary.rows, 2);
        let path = export_file_path(dir.path(), user_id);
        assert_eq!(summary.path, path.display().to_string());
        let bytes = std::fs::read(&path).unwrap();
        // xlsx 是 zip 容器
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_export_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.xlsx");
        assert_eq!(write_workbook(&path, &[]).unwrap(), 0);
        assert!(path.exists());
    }
}
