//! 测试辅助模块
//! 内存仓储、脚本化托管方与记录型通知器

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;
use walletdesk::{
    app_state::AppState,
    config::Config,
    domain::WalletRequestStatus,
    infrastructure::jwt,
    repository::{
        wallet_request_repository::initial_no_of_coins, StatusUpdateParams, UpsertAddressParams,
        User, UserRepository, WalletAddressRequest, WalletRequestRepository, WalletRequestView,
    },
    service::{
        custody::{
            AddressPage, CreateVaultAccount, CustodyApi, CustodyError, DepositAddress,
            SupportedAsset, VaultAccount, ASSET_ALREADY_EXISTS,
        },
        notification_service::{Notifier, UserNotification},
        WalletRequestService,
    },
};

pub const TEST_JWT_SECRET: &str = "test_secret_that_is_at_least_32_characters_long";

// ============ 用户仓储 ============

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUsers {
    pub fn add(&self, email: &str, role: &str, vault: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        self.users.lock().unwrap().insert(
            id,
            User {
                id,
                email: email.to_string(),
                first_name: Some("Test".into()),
                last_name: Some("User".into()),
                role: role.to_string(),
                vault_account_id: vault.map(str::to_string),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.get(user_id))
    }

    async fn attach_vault_account(&self, user_id: Uuid, vault_account_id: &str) -> Result<String> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("user {} not found", user_id))?;
        if let Some(existing) = user.vault_id() {
            return Ok(existing.to_string());
        }
        user.vault_account_id = Some(vault_account_id.to_string());
        Ok(vault_account_id.to_string())
    }
}

// ============ 申请仓储 ============

pub struct InMemoryWalletRequests {
    users: Arc<InMemoryUsers>,
    rows: Mutex<Vec<WalletAddressRequest>>,
}

impl InMemoryWalletRequests {
    pub fn new(users: Arc<InMemoryUsers>) -> Self {
        Self {
            users,
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn all(&self) -> Vec<WalletAddressRequest> {
        self.rows.lock().unwrap().clone()
    }

    /// 直接写入一条记录（模拟历史数据）
    pub fn seed(&self, user_id: Uuid, coin: &str, asset_id: &str, status: &str) -> Uuid {
        let now = chrono::Utc::now();
        let id = Uuid::new_v4();
        self.rows.lock().unwrap().push(WalletAddressRequest {
            id,
            user_id,
            coin: coin.to_string(),
            asset_id: asset_id.to_string(),
            wallet_address: String::new(),
            status: WalletRequestStatus::parse(status),
            no_of_coins: initial_no_of_coins(),
            comment: None,
            history: vec![serde_json::json!({"status": status})],
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn view(&self, row: WalletAddressRequest) -> Option<WalletRequestView> {
        let user = self.users.get(row.user_id)?;
        Some(WalletRequestView {
            request: row,
            user: user.profile(),
        })
    }
}

#[async_trait]
impl WalletRequestRepository for InMemoryWalletRequests {
    async fn upsert_address(&self, p: UpsertAddressParams) -> Result<WalletAddressRequest> {
        let mut rows = self.rows.lock().unwrap();
        let now = chrono::Utc::now();
        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.user_id == p.user_id && r.coin == p.coin)
        {
            row.wallet_address = p.wallet_address;
            row.asset_id = p.asset_id;
            row.updated_at = now;
            return Ok(row.clone());
        }
        let row = WalletAddressRequest {
            id: Uuid::new_v4(),
            user_id: p.user_id,
            coin: p.coin,
            asset_id: p.asset_id,
            wallet_address: p.wallet_address,
            status: WalletRequestStatus::Completed,
            no_of_coins: initial_no_of_coins(),
            comment: None,
            history: vec![],
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WalletAddressRequest>> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_user_and_coin(
        &self,
        user_id: Uuid,
        coin: &str,
    ) -> Result<Option<WalletAddressRequest>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id && r.coin == coin)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WalletRequestView>> {
        let rows: Vec<_> = self
            .all()
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        Ok(rows.into_iter().filter_map(|r| self.view(r)).collect())
    }

    async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<WalletRequestView>> {
        Ok(self
            .all()
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|r| self.view(r))
            .collect())
    }

    async fn update_status(&self, p: StatusUpdateParams) -> Result<Option<WalletAddressRequest>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|r| r.id == p.id) else {
            return Ok(None);
        };
        row.status = p.status;
        row.comment = p.comment;
        if let Some(addr) = p.wallet_address {
            row.wallet_address = addr;
        }
        row.history.clear();
        row.updated_at = chrono::Utc::now();
        Ok(Some(row.clone()))
    }
}

// ============ 托管方 ============

#[derive(Default)]
struct CustodyScript {
    next_vault_id: u32,
    fail_vault_creation: bool,
    /// 已在 Vault 上创建的 (vault, asset)
    vault_assets: HashSet<(String, String)>,
    /// 托管方拒绝的资产
    rejected_assets: HashSet<String>,
    /// 每个资产已有的地址
    existing_addresses: HashMap<String, Vec<String>>,
    /// 新生成地址
    new_addresses: HashMap<String, String>,
    transport_failure: bool,
    calls: HashMap<&'static str, usize>,
}

/// 脚本化托管方：记录每个接口的调用次数
#[derive(Default)]
pub struct ScriptedCustody {
    script: Mutex<CustodyScript>,
}

impl ScriptedCustody {
    pub fn new_address(&self, asset_id: &str, address: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .new_addresses
            .insert(asset_id.to_string(), address.to_string());
        self
    }

    pub fn existing_address(&self, vault_id: &str, asset_id: &str, address: &str) -> &Self {
        let mut s = self.script.lock().unwrap();
        s.vault_assets
            .insert((vault_id.to_string(), asset_id.to_string()));
        s.existing_addresses
            .entry(asset_id.to_string())
            .or_default()
            .push(address.to_string());
        drop(s);
        self
    }

    pub fn reject_asset(&self, asset_id: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .rejected_assets
            .insert(asset_id.to_string());
        self
    }

    pub fn fail_vault_creation(&self) -> &Self {
        self.script.lock().unwrap().fail_vault_creation = true;
        self
    }

    pub fn fail_transport(&self) -> &Self {
        self.script.lock().unwrap().transport_failure = true;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .calls
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn record(s: &mut CustodyScript, name: &'static str) -> Result<(), CustodyError> {
        *s.calls.entry(name).or_insert(0) += 1;
        if s.transport_failure {
            return Err(CustodyError::Transport("connection reset".into()));
        }
        Ok(())
    }

    fn generate(s: &CustodyScript, asset_id: &str) -> Result<DepositAddress, CustodyError> {
        if s.rejected_assets.contains(asset_id) {
            return Err(CustodyError::Api {
                status: 400,
                code: Some(1006),
                message: "The asset is not supported".into(),
            });
        }
        Ok(DepositAddress {
            address: s.new_addresses.get(asset_id).cloned().unwrap_or_default(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl CustodyApi for ScriptedCustody {
    async fn create_vault_account(
        &self,
        req: &CreateVaultAccount,
    ) -> Result<VaultAccount, CustodyError> {
        let mut s = self.script.lock().unwrap();
        Self::record(&mut s, "create_vault_account")?;
        if s.fail_vault_creation {
            return Err(CustodyError::Api {
                status: 500,
                code: None,
                message: "vault creation failed".into(),
            });
        }
        s.next_vault_id += 1;
        Ok(VaultAccount {
            id: s.next_vault_id.to_string(),
            name: Some(req.name.clone()),
        })
    }

    async fn create_vault_asset(
        &self,
        vault_id: &str,
        asset_id: &str,
    ) -> Result<DepositAddress, CustodyError> {
        let mut s = self.script.lock().unwrap();
        Self::record(&mut s, "create_vault_asset")?;
        let key = (vault_id.to_string(), asset_id.to_string());
        if s.vault_assets.contains(&key) {
            return Err(CustodyError::Api {
                status: 400,
                code: Some(ASSET_ALREADY_EXISTS),
                message: "Asset already exists".into(),
            });
        }
        let created = Self::generate(&s, asset_id)?;
        s.vault_assets.insert(key);
        Ok(created)
    }

    async fn list_deposit_addresses(
        &self,
        _vault_id: &str,
        asset_id: &str,
    ) -> Result<AddressPage, CustodyError> {
        let mut s = self.script.lock().unwrap();
        Self::record(&mut s, "list_deposit_addresses")?;
        let addresses = s
            .existing_addresses
            .get(asset_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|address| DepositAddress {
                address,
                ..Default::default()
            })
            .collect();
        Ok(AddressPage {
            addresses,
            paging: None,
        })
    }

    async fn create_deposit_address(
        &self,
        _vault_id: &str,
        asset_id: &str,
    ) -> Result<DepositAddress, CustodyError> {
        let mut s = self.script.lock().unwrap();
        Self::record(&mut s, "create_deposit_address")?;
        Self::generate(&s, asset_id)
    }

    async fn supported_assets(&self) -> Result<Vec<SupportedAsset>, CustodyError> {
        let mut s = self.script.lock().unwrap();
        Self::record(&mut s, "supported_assets")?;
        Ok(["BTC_TEST", "ETH_TEST5", "USDT_ERC20"]
            .into_iter()
            .map(|id| SupportedAsset {
                id: id.to_string(),
                name: None,
                asset_type: None,
                native_asset: None,
            })
            .collect())
    }
}

// ============ 通知 ============

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<UserNotification>>,
    pub fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<UserNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_user(&self, n: UserNotification) -> Result<Uuid> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("notification store unavailable");
        }
        self.sent.lock().unwrap().push(n);
        Ok(Uuid::new_v4())
    }
}

// ============ 装配 ============

pub struct Harness {
    pub users: Arc<InMemoryUsers>,
    pub requests: Arc<InMemoryWalletRequests>,
    pub custody: Arc<ScriptedCustody>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: Arc<AppState>,
    pub export_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUsers::default());
        let requests = Arc::new(InMemoryWalletRequests::new(users.clone()));
        let custody = Arc::new(ScriptedCustody::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let export_dir = tempfile::tempdir().expect("tempdir");

        let mut config = Config::from_env().expect("config");
        config.jwt.secret = TEST_JWT_SECRET.to_string();
        config.export.dir = export_dir.path().display().to_string();

        let state = Arc::new(AppState::from_parts(
            Arc::new(config),
            users.clone(),
            requests.clone(),
            custody.clone(),
            notifier.clone(),
            None,
        ));

        Self {
            users,
            requests,
            custody,
            notifier,
            state,
            export_dir,
        }
    }

    pub fn service(&self) -> &WalletRequestService {
        &self.state.wallet_requests
    }

    pub fn token(&self, user_id: Uuid, role: &str) -> String {
        jwt::generate_token(user_id, role, TEST_JWT_SECRET, 3600).expect("token")
    }
}
