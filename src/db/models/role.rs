//! Roles, page capabilities and role-based access control.

use serde::{Deserialize, Serialize};

/// Staff roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, manages users
    Admin,
    Manager,
    Chief,
    /// Heads the design department, has no access to repairs
    DesignChief,
    ProductionChief,
    /// Works only on requests assigned to them
    Executor,
}

/// A page or section of the application gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ClientRequests,
    RepairRequests,
    ClientBase,
    Kanban,
    Chat,
}

use Capability::*;

const FULL_ACCESS: &[Capability] = &[ClientRequests, RepairRequests, ClientBase, Kanban, Chat];
const DESIGN_ACCESS: &[Capability] = &[ClientRequests, ClientBase, Kanban, Chat];
const EXECUTOR_ACCESS: &[Capability] = &[ClientBase, Kanban, Chat];

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Manager,
        Role::Chief,
        Role::DesignChief,
        Role::ProductionChief,
        Role::Executor,
    ];

    /// Pages this role may open
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Admin | Role::Manager | Role::Chief | Role::ProductionChief => FULL_ACCESS,
            Role::DesignChief => DESIGN_ACCESS,
            Role::Executor => EXECUTOR_ACCESS,
        }
    }

    pub fn can_access(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn is_executor(&self) -> bool {
        matches!(self, Role::Executor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Chief => "chief",
            Role::DesignChief => "design_chief",
            Role::ProductionChief => "production_chief",
            Role::Executor => "executor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "chief" => Ok(Role::Chief),
            "design_chief" => Ok(Role::DesignChief),
            "production_chief" => Ok(Role::ProductionChief),
            "executor" => Ok(Role::Executor),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl Capability {
    pub const ALL: [Capability; 5] = [ClientRequests, RepairRequests, ClientBase, Kanban, Chat];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRequests => "client_requests",
            RepairRequests => "repair_requests",
            ClientBase => "client_base",
            Kanban => "kanban",
            Chat => "chat",
        }
    }

    /// URL path of the page behind this capability
    pub fn path(&self) -> &'static str {
        match self {
            ClientRequests => "/client_requests/",
            RepairRequests => "/repair_requests/",
            ClientBase => "/client_base/",
            Kanban => "/kanban/",
            Chat => "/chat/",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse role checks wrapped around actions rather than pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGuard {
    /// Administrators only
    Admin,
    /// Any staff member who manages work: everyone except executors
    Manager,
    /// Executors only
    Executor,
}

impl RoleGuard {
    pub fn admits(&self, role: Role) -> bool {
        match self {
            RoleGuard::Admin => matches!(role, Role::Admin),
            RoleGuard::Manager => !role.is_executor(),
            RoleGuard::Executor => role.is_executor(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RoleGuard::Admin => "admin",
            RoleGuard::Manager => "manager",
            RoleGuard::Executor => "executor",
        }
    }
}
