use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 员工权限代码, 以 (code, user_uid) 行存储在 permissions 表
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionCode {
    CUser,
    RUser,
    UUser,
    DUser,
    CMessage,
    RMessage,
    UMessage,
    DMessage,
    RChat,
    UChat,
    DChat,
    CPermission,
    RPermission,
    UPermission,
    DPermission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionGroup {
    User,
    Message,
    Chat,
    Permission,
}

impl PermissionGroup {
    pub fn name(&self) -> &'static str {
        match self {
            PermissionGroup::User => "用户",
            PermissionGroup::Message => "消息",
            PermissionGroup::Chat => "聊天",
            PermissionGroup::Permission => "权限",
        }
    }
}

impl PermissionCode {
    pub const ALL: [PermissionCode; 15] = [
        PermissionCode::CUser,
        PermissionCode::RUser,
        PermissionCode::UUser,
        PermissionCode::DUser,
        PermissionCode::CMessage,
        PermissionCode::RMessage,
        PermissionCode::UMessage,
        PermissionCode::DMessage,
        PermissionCode::RChat,
        PermissionCode::UChat,
        PermissionCode::DChat,
        PermissionCode::CPermission,
        PermissionCode::RPermission,
        PermissionCode::UPermission,
        PermissionCode::DPermission,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCode::CUser => "C_USER",
            PermissionCode::RUser => "R_USER",
            PermissionCode::UUser => "U_USER",
            PermissionCode::DUser => "D_USER",
            PermissionCode::CMessage => "C_MESSAGE",
            PermissionCode::RMessage => "R_MESSAGE",
            PermissionCode::UMessage => "U_MESSAGE",
            PermissionCode::DMessage => "D_MESSAGE",
            PermissionCode::RChat => "R_CHAT",
            PermissionCode::UChat => "U_CHAT",
            PermissionCode::DChat => "D_CHAT",
            PermissionCode::CPermission => "C_PERMISSION",
            PermissionCode::RPermission => "R_PERMISSION",
            PermissionCode::UPermission => "U_PERMISSION",
            PermissionCode::DPermission => "D_PERMISSION",
        }
    }

    pub fn parse(value: &str) -> Option<PermissionCode> {
        PermissionCode::ALL
            .iter()
            .find(|code| code.as_str() == value)
            .copied()
    }

    /// 后台界面展示用的名称
    pub fn name(&self) -> &'static str {
        match self {
            PermissionCode::CUser => "创建用户",
            PermissionCode::RUser => "查看用户",
            PermissionCode::UUser => "编辑用户",
            PermissionCode::DUser => "删除用户",
            PermissionCode::CMessage => "发送消息",
            PermissionCode::RMessage => "查看消息",
            PermissionCode::UMessage => "编辑消息",
            PermissionCode::DMessage => "删除消息",
            PermissionCode::RChat => "查看聊天",
            PermissionCode::UChat => "编辑聊天",
            PermissionCode::DChat => "删除聊天",
            PermissionCode::CPermission => "创建权限",
            PermissionCode::RPermission => "查看权限",
            PermissionCode::UPermission => "管理权限",
            PermissionCode::DPermission => "删除权限",
        }
    }

    pub fn group(&self) -> PermissionGroup {
        match self {
            PermissionCode::CUser
            | PermissionCode::RUser
            | PermissionCode::UUser
            | PermissionCode::DUser => PermissionGroup::User,
            PermissionCode::CMessage
            | PermissionCode::RMessage
            | PermissionCode::UMessage
            | PermissionCode::DMessage => PermissionGroup::Message,
            PermissionCode::RChat | PermissionCode::UChat | PermissionCode::DChat => {
                PermissionGroup::Chat
            }
            PermissionCode::CPermission
            | PermissionCode::RPermission
            | PermissionCode::UPermission
            | PermissionCode::DPermission => PermissionGroup::Permission,
        }
    }

    /// 静态蕴含表: 持有某个代码时自动附带的代码
    fn implied(&self) -> &'static [PermissionCode] {
        match self {
            PermissionCode::RPermission => &[PermissionCode::RUser],
            // 能管理权限就能给自己发任何权限, 因此直接蕴含全部
            PermissionCode::UPermission => &PermissionCode::ALL,
            PermissionCode::UUser | PermissionCode::DUser => &[PermissionCode::RUser],
            PermissionCode::CMessage | PermissionCode::RMessage => &[PermissionCode::RChat],
            PermissionCode::UMessage | PermissionCode::DMessage => {
                &[PermissionCode::RChat, PermissionCode::RMessage]
            }
            PermissionCode::UChat | PermissionCode::DChat => &[PermissionCode::RChat],
            _ => &[],
        }
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 权限闭包: 并入每个代码蕴含的代码. 蕴含表只有一层深度, 一次遍历即收敛
pub fn expand(codes: &BTreeSet<PermissionCode>) -> BTreeSet<PermissionCode> {
    let mut expanded = codes.clone();
    for code in codes {
        expanded.extend(code.implied().iter().copied());
    }
    expanded
}

/// 保存权限集前的闭包计算; 编辑自己的权限时强制保留管理权限, 防止自我锁定
pub fn expand_for_update(
    requested: &BTreeSet<PermissionCode>,
    editing_self: bool,
) -> BTreeSet<PermissionCode> {
    let mut requested = requested.clone();
    if editing_self {
        requested.insert(PermissionCode::UPermission);
    }
    expand(&requested)
}

/// 所需代码必须全部被持有; 空的所需集合等于仅要求已登录
pub fn authorize(required: &[PermissionCode], held: &BTreeSet<PermissionCode>) -> bool {
    required.iter().all(|code| held.contains(code))
}
