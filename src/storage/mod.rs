//! SQLite 本地进度存储模块
//!
//! 提供游戏进度的本地持久化能力，支持：
//! - 每局结算成绩的离线落库
//! - 按学科 / 学生的进度查询与聚合统计
//! - 设备间离线迁移（导出 / 导入）的存取支撑

// ============================================================
// 子模块声明
// ============================================================

pub mod migrations;
pub mod models;
pub mod progress;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use migrations::run_migrations;
pub use models::ProgressRecord;
pub use progress::{ProgressRepository, ProgressStats};

// ============================================================
// 依赖导入
// ============================================================

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("同步错误: {0}")]
    Sync(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("锁获取失败: {0}")]
    LockError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// Storage - 数据库句柄
// ============================================================

/// 数据库句柄
///
/// 由应用组合根显式构造并传给领域服务，进程内复用同一个连接。
///
/// # Example
/// ```ignore
/// let storage = Storage::new("./data/stemquest.db")?;
/// let service = ProgressService::new(Arc::new(storage));
/// ```
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Storage {
    /// 打开（或创建）文件数据库
    ///
    /// 自动启用 WAL 模式、外键约束，并运行数据库迁移。
    /// 迁移是幂等的，重复打开同一个库不会产生副作用。
    pub fn new<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        // WAL 模式提高单写多读下的并发表现
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        Self::from_connection(connection, path_str)
    }

    /// 创建内存数据库（用于测试）
    ///
    /// 内存数据库不使用 WAL 模式，但启用外键约束。
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;

        connection.execute_batch("PRAGMA foreign_keys=ON;")?;

        Self::from_connection(connection, ":memory:".to_string())
    }

    fn from_connection(connection: Connection, db_path: String) -> StorageResult<Self> {
        let storage = Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path,
        };

        // 自动运行迁移
        storage.initialize()?;

        Ok(storage)
    }

    /// 初始化数据库（运行迁移）
    ///
    /// 可安全地多次调用；已应用的迁移会被跳过。
    pub fn initialize(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        migrations::run_migrations(&conn)?;
        Ok(())
    }

    /// 获取数据库连接
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库连接的锁
    ///
    /// 这是直接操作连接的推荐方式。
    pub fn get_connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 获取进度记录仓库
    pub fn progress(&self) -> ProgressRepository {
        ProgressRepository::new(Arc::clone(&self.conn))
    }

    /// 执行事务
    ///
    /// # Example
    /// ```ignore
    /// let result = storage.transaction(|conn| {
    ///     conn.execute("INSERT INTO ...", [])?;
    ///     Ok(42)
    /// })?;
    /// ```
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self.get_connection()?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }
}

// ============================================================
// 测试
// ============================================================
