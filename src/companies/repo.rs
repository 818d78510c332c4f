use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Partial update: only the fields present are replaced.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Company {
    fn apply(&mut self, patch: CompanyPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if patch.address.is_some() {
            self.address = patch.address;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.phone.is_some() {
            self.phone = patch.phone;
        }
    }
}

#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn list(&self) -> Vec<Company>;
    async fn get(&self, id: Uuid) -> Option<Company>;
    async fn create(&self, new: NewCompany) -> Company;
    async fn update(&self, id: Uuid, patch: CompanyPatch) -> Option<Company>;
    async fn delete(&self, id: Uuid) -> bool;
}

/// Companies kept in insertion order for the lifetime of the process.
#[derive(Default)]
pub struct MemoryCompanyStore {
    companies: RwLock<Vec<Company>>,
}

impl MemoryCompanyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompanyStore for MemoryCompanyStore {
    async fn list(&self) -> Vec<Company> {
        self.companies.read().await.clone()
    }

    async fn get(&self, id: Uuid) -> Option<Company> {
        self.companies
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    async fn create(&self, new: NewCompany) -> Company {
        let company = Company {
            id: Uuid::new_v4(),
            name: new.name,
            address: new.address,
            email: new.email,
            phone: new.phone,
        };
        self.companies.write().await.push(company.clone());
        company
    }

    async fn update(&self, id: Uuid, patch: CompanyPatch) -> Option<Company> {
        let mut companies = self.companies.write().await;
        let company = companies.iter_mut().find(|c| c.id == id)?;
        company.apply(patch);
        Some(company.clone())
    }

    async fn delete(&self, id: Uuid) -> bool {
        let mut companies = self.companies.write().await;
        let before = companies.len();
        companies.retain(|c| c.id != id);
        companies.len() < before
    }
}
