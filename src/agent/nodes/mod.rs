//! 管线节点 - 问答管线与仓库分析管线的具体工作单元

pub mod chat;
pub mod stack;

/// 问答管线节点名
pub const ANALYZE_AND_SEARCH: &str = "analyze_and_search";
pub const FRONTEND_ACTIONS: &str = "frontend_actions";

/// 仓库分析管线节点名
pub const GATHER_CONTEXT: &str = "gather_context";
pub const ANALYZE: &str = "analyze";

/// 两条管线共用的终止节点名
pub const FINISH: &str = "finish";
