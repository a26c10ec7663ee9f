//! Built-in Azure Verified Module definitions.

use super::{CatalogEntry, Category};

const RG_NAME: &str = "azurerm_resource_group.main.name";

fn res(name: &str, source: &str, version: &str, category: Category, description: &str) -> CatalogEntry {
    CatalogEntry::new(name, source, version, category, description)
}

pub(super) fn builtin_entries() -> Vec<CatalogEntry> {
    let mut entries = Vec::with_capacity(40);
    entries.extend(compute());
    entries.extend(networking());
    entries.extend(storage());
    entries.extend(databases());
    entries.extend(security());
    entries.extend(messaging());
    entries.extend(monitoring());
    entries.extend(ai());
    entries
}

fn compute() -> Vec<CatalogEntry> {
    vec![
        res(
            "virtual_machine",
            "Azure/avm-res-compute-virtualmachine/azurerm",
            "0.20.0",
            Category::Compute,
            "Deploy Azure Virtual Machines with best practices including availability zones and managed disks",
        )
        .with_resource_type("Microsoft.Compute/virtualMachines")
        .with_aliases(&["vm", "virtual-machine", "compute", "server"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name", "private_ip_address", "public_ip_address"])
        .with_default("os_type", "\"Linux\"")
        .with_default("sku_size", "\"Standard_D2s_v3\""),
        res(
            "virtual_machine_scale_set",
            "Azure/avm-res-compute-virtualmachinescaleset/azurerm",
            "0.6.0",
            Category::Compute,
            "Deploy Azure Virtual Machine Scale Sets for auto-scaling compute",
        )
        .with_resource_type("Microsoft.Compute/virtualMachineScaleSets")
        .with_aliases(&["vmss", "scale-set", "autoscale"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name", "unique_id"]),
        res(
            "container_app",
            "Azure/avm-res-app-containerapp/azurerm",
            "0.5.0",
            Category::Compute,
            "Deploy Azure Container Apps for serverless container workloads",
        )
        .with_resource_type("Microsoft.App/containerApps")
        .with_aliases(&["containerapp", "container-app", "aca"])
        .with_dependencies(&["container_app_environment"])
        .with_outputs(&["resource_id", "name", "fqdn", "latest_revision_fqdn"]),
        res(
            "container_app_environment",
            "Azure/avm-res-app-managedenvironment/azurerm",
            "0.3.0",
            Category::Compute,
            "Deploy Azure Container App Environment",
        )
        .with_resource_type("Microsoft.App/managedEnvironments")
        .with_aliases(&["cae", "container-app-env", "managed-environment"])
        .with_dependencies(&["log_analytics_workspace"])
        .with_outputs(&["resource_id", "name", "default_domain", "static_ip_address"]),
        res(
            "kubernetes_cluster",
            "Azure/avm-res-containerservice-managedcluster/azurerm",
            "0.5.0",
            Category::Compute,
            "Deploy Azure Kubernetes Service (AKS) clusters",
        )
        .with_resource_type("Microsoft.ContainerService/managedClusters")
        .with_aliases(&["aks", "kubernetes", "k8s"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name", "kube_config", "oidc_issuer_url"]),
        res(
            "container_registry",
            "Azure/avm-res-containerregistry-registry/azurerm",
            "0.5.0",
            Category::Compute,
            "Deploy Azure Container Registry for container image storage",
        )
        .with_resource_type("Microsoft.ContainerRegistry/registries")
        .with_aliases(&["acr", "container-registry", "docker-registry"])
        .with_outputs(&["resource_id", "name", "login_server", "admin_username"]),
        res(
            "function_app",
            "Azure/avm-res-web-site/azurerm",
            "0.17.0",
            Category::Compute,
            "Deploy Azure Functions for serverless compute",
        )
        .with_resource_type("Microsoft.Web/sites")
        .with_aliases(&["function", "functions", "azure-function", "serverless"])
        .with_dependencies(&["app_service_plan", "storage_account"])
        .with_outputs(&["resource_id", "name", "default_hostname", "identity"])
        .with_default("kind", "\"functionapp\"")
        .with_default("os_type", "\"Linux\""),
        res(
            "web_app",
            "Azure/avm-res-web-site/azurerm",
            "0.17.0",
            Category::Compute,
            "Deploy Azure App Service Web Apps",
        )
        .with_resource_type("Microsoft.Web/sites")
        .with_aliases(&["webapp", "app-service", "web"])
        .with_dependencies(&["app_service_plan"])
        .with_outputs(&["resource_id", "name", "default_hostname"])
        .with_default("kind", "\"webapp\"")
        .with_default("os_type", "\"Linux\""),
        res(
            "app_service_plan",
            "Azure/avm-res-web-serverfarm/azurerm",
            "0.4.0",
            Category::Compute,
            "Deploy Azure App Service Plans",
        )
        .with_resource_type("Microsoft.Web/serverfarms")
        .with_aliases(&["asp", "service-plan"])
        .with_outputs(&["resource_id", "name"])
        .with_default("os_type", "\"Linux\""),
    ]
}

fn networking() -> Vec<CatalogEntry> {
    vec![
        res(
            "virtual_network",
            "Azure/avm-res-network-virtualnetwork/azurerm",
            "0.8.0",
            Category::Networking,
            "Deploy Azure Virtual Networks with subnets and service endpoints",
        )
        .with_resource_type("Microsoft.Network/virtualNetworks")
        .with_aliases(&["vnet", "network", "virtual-network"])
        .with_outputs(&["resource_id", "name", "subnets"])
        .with_default("address_space", "[\"10.0.0.0/16\"]")
        .with_example(&format!(
            r#"
module "virtual_network" {{
  source  = "Azure/avm-res-network-virtualnetwork/azurerm"
  version = "~> 0.8"

  name                = "vnet-example"
  resource_group_name = {RG_NAME}
  location            = azurerm_resource_group.main.location
  address_space       = ["10.0.0.0/16"]

  subnets = {{
    default = {{
      name             = "default"
      address_prefixes = ["10.0.1.0/24"]
    }}
  }}
}}
"#
        )),
        res(
            "network_security_group",
            "Azure/avm-res-network-networksecuritygroup/azurerm",
            "0.4.0",
            Category::Networking,
            "Deploy Azure Network Security Groups",
        )
        .with_resource_type("Microsoft.Network/networkSecurityGroups")
        .with_aliases(&["nsg", "security-group", "firewall-rules"])
        .with_outputs(&["resource_id", "name"]),
        res(
            "application_gateway",
            "Azure/avm-res-network-applicationgateway/azurerm",
            "0.4.0",
            Category::Networking,
            "Deploy Azure Application Gateway for web application load balancing",
        )
        .with_resource_type("Microsoft.Network/applicationGateways")
        .with_aliases(&["appgw", "app-gateway", "waf"])
        .with_dependencies(&["virtual_network", "public_ip"])
        .with_outputs(&["resource_id", "name", "frontend_ip_configuration"]),
        res(
            "load_balancer",
            "Azure/avm-res-network-loadbalancer/azurerm",
            "0.4.0",
            Category::Networking,
            "Deploy Azure Load Balancer for network traffic distribution",
        )
        .with_resource_type("Microsoft.Network/loadBalancers")
        .with_aliases(&["lb", "balancer"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name", "frontend_ip_configuration"]),
        res(
            "public_ip",
            "Azure/avm-res-network-publicipaddress/azurerm",
            "0.2.0",
            Category::Networking,
            "Deploy Azure Public IP Addresses",
        )
        .with_resource_type("Microsoft.Network/publicIPAddresses")
        .with_aliases(&["pip", "public-ip", "external-ip"])
        .with_outputs(&["resource_id", "name", "ip_address"]),
        res(
            "private_endpoint",
            "Azure/avm-res-network-privateendpoint/azurerm",
            "0.10.0",
            Category::Networking,
            "Deploy Azure Private Endpoints for secure connectivity",
        )
        .with_resource_type("Microsoft.Network/privateEndpoints")
        .with_aliases(&["pe", "private-link"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name", "private_ip_address"]),
        res(
            "dns_zone",
            "Azure/avm-res-network-dnszone/azurerm",
            "0.3.0",
            Category::Networking,
            "Deploy Azure DNS Zones",
        )
        .with_resource_type("Microsoft.Network/dnsZones")
        .with_aliases(&["dns", "domain"])
        .with_outputs(&["resource_id", "name", "name_servers"]),
        res(
            "private_dns_zone",
            "Azure/avm-res-network-privatednszone/azurerm",
            "0.3.0",
            Category::Networking,
            "Deploy Azure Private DNS Zones",
        )
        .with_resource_type("Microsoft.Network/privateDnsZones")
        .with_aliases(&["private-dns", "internal-dns"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name"]),
        res(
            "front_door",
            "Azure/avm-res-cdn-profile/azurerm",
            "0.7.0",
            Category::Networking,
            "Deploy Azure Front Door for global load balancing and CDN",
        )
        .with_resource_type("Microsoft.Cdn/profiles")
        .with_aliases(&["frontdoor", "cdn", "afd"])
        .with_outputs(&["resource_id", "name", "endpoints"]),
        res(
            "firewall",
            "Azure/avm-res-network-azurefirewall/azurerm",
            "0.4.0",
            Category::Networking,
            "Deploy Azure Firewall for network security",
        )
        .with_resource_type("Microsoft.Network/azureFirewalls")
        .with_aliases(&["azure-firewall", "fw"])
        .with_dependencies(&["virtual_network", "public_ip"])
        .with_outputs(&["resource_id", "name", "private_ip_address", "public_ip_address"]),
        res(
            "bastion",
            "Azure/avm-res-network-bastionhost/azurerm",
            "0.4.0",
            Category::Networking,
            "Deploy Azure Bastion for secure RDP/SSH connectivity",
        )
        .with_resource_type("Microsoft.Network/bastionHosts")
        .with_aliases(&["bastion-host", "jump-box"])
        .with_dependencies(&["virtual_network", "public_ip"])
        .with_outputs(&["resource_id", "name", "dns_name"]),
        res(
            "nat_gateway",
            "Azure/avm-res-network-natgateway/azurerm",
            "0.3.0",
            Category::Networking,
            "Deploy Azure NAT Gateway for outbound connectivity",
        )
        .with_resource_type("Microsoft.Network/natGateways")
        .with_aliases(&["nat", "outbound-gateway"])
        .with_dependencies(&["public_ip"])
        .with_outputs(&["resource_id", "name"]),
    ]
}

fn storage() -> Vec<CatalogEntry> {
    vec![res(
        "storage_account",
        "Azure/avm-res-storage-storageaccount/azurerm",
        "0.5.0",
        Category::Storage,
        "Deploy Azure Storage Accounts with containers, queues, tables, and file shares",
    )
    .with_resource_type("Microsoft.Storage/storageAccounts")
    .with_aliases(&["storage", "blob", "files", "queue", "table"])
    .with_outputs(&[
        "resource_id",
        "name",
        "primary_access_key",
        "primary_connection_string",
        "primary_blob_endpoint",
    ])
    .with_default("account_tier", "\"Standard\"")
    .with_default("account_replication_type", "\"LRS\"")]
}

fn databases() -> Vec<CatalogEntry> {
    vec![
        res(
            "sql_server",
            "Azure/avm-res-sql-server/azurerm",
            "0.3.0",
            Category::Database,
            "Deploy Azure SQL Server",
        )
        .with_resource_type("Microsoft.Sql/servers")
        .with_aliases(&["mssql", "sql", "azure-sql"])
        .with_outputs(&["resource_id", "name", "fully_qualified_domain_name"]),
        res(
            "sql_database",
            "Azure/avm-res-sql-server/azurerm",
            "0.3.0",
            Category::Database,
            "Deploy Azure SQL Database (part of SQL Server module)",
        )
        .with_resource_type("Microsoft.Sql/servers/databases")
        .with_aliases(&["sql-db", "database"])
        .with_dependencies(&["sql_server"])
        .with_outputs(&["resource_id", "name"]),
        res(
            "postgresql_flexible",
            "Azure/avm-res-dbforpostgresql-flexibleserver/azurerm",
            "0.4.0",
            Category::Database,
            "Deploy Azure Database for PostgreSQL Flexible Server",
        )
        .with_resource_type("Microsoft.DBforPostgreSQL/flexibleServers")
        .with_aliases(&["postgres", "postgresql", "pg"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name", "fqdn"]),
        res(
            "mysql_flexible",
            "Azure/avm-res-dbformysql-flexibleserver/azurerm",
            "0.4.0",
            Category::Database,
            "Deploy Azure Database for MySQL Flexible Server",
        )
        .with_resource_type("Microsoft.DBforMySQL/flexibleServers")
        .with_aliases(&["mysql"])
        .with_dependencies(&["virtual_network"])
        .with_outputs(&["resource_id", "name", "fqdn"]),
        res(
            "cosmosdb",
            "Azure/avm-res-documentdb-databaseaccount/azurerm",
            "0.10.0",
            Category::Database,
            "Deploy Azure Cosmos DB accounts",
        )
        .with_resource_type("Microsoft.DocumentDB/databaseAccounts")
        .with_aliases(&["cosmos", "documentdb", "nosql"])
        .with_outputs(&["resource_id", "name", "endpoint", "primary_key", "connection_strings"]),
        res(
            "redis",
            "Azure/avm-res-cache-redis/azurerm",
            "0.4.0",
            Category::Database,
            "Deploy Azure Cache for Redis",
        )
        .with_resource_type("Microsoft.Cache/redis")
        .with_aliases(&["cache", "redis-cache"])
        .with_outputs(&[
            "resource_id",
            "name",
            "hostname",
            "primary_access_key",
            "primary_connection_string",
        ]),
    ]
}

fn security() -> Vec<CatalogEntry> {
    vec![
        res(
            "key_vault",
            "Azure/avm-res-keyvault-vault/azurerm",
            "0.10.0",
            Category::Security,
            "Deploy Azure Key Vault for secrets, keys, and certificates management",
        )
        .with_resource_type("Microsoft.KeyVault/vaults")
        .with_aliases(&["keyvault", "vault", "secrets"])
        .with_outputs(&["resource_id", "name", "vault_uri"])
        .with_default("tenant_id", "data.azurerm_client_config.current.tenant_id")
        .with_default("sku_name", "\"standard\""),
        res(
            "managed_identity",
            "Azure/avm-res-managedidentity-userassignedidentity/azurerm",
            "0.4.0",
            Category::Security,
            "Deploy Azure User Assigned Managed Identity",
        )
        .with_resource_type("Microsoft.ManagedIdentity/userAssignedIdentities")
        .with_aliases(&["identity", "uami", "user-assigned-identity"])
        .with_outputs(&["resource_id", "name", "client_id", "principal_id", "tenant_id"]),
    ]
}

fn messaging() -> Vec<CatalogEntry> {
    vec![
        res(
            "event_hub",
            "Azure/avm-res-eventhub-namespace/azurerm",
            "0.8.0",
            Category::Messaging,
            "Deploy Azure Event Hub namespace and hubs",
        )
        .with_resource_type("Microsoft.EventHub/namespaces")
        .with_aliases(&["eventhub", "event-hubs", "streaming"])
        .with_outputs(&["resource_id", "name", "default_primary_connection_string"]),
        res(
            "service_bus",
            "Azure/avm-res-servicebus-namespace/azurerm",
            "0.5.0",
            Category::Messaging,
            "Deploy Azure Service Bus namespace, queues, and topics",
        )
        .with_resource_type("Microsoft.ServiceBus/namespaces")
        .with_aliases(&["servicebus", "message-queue", "pubsub"])
        .with_outputs(&["resource_id", "name", "default_primary_connection_string"]),
        res(
            "event_grid",
            "Azure/avm-res-eventgrid-topic/azurerm",
            "0.3.0",
            Category::Messaging,
            "Deploy Azure Event Grid topics",
        )
        .with_resource_type("Microsoft.EventGrid/topics")
        .with_aliases(&["eventgrid", "events"])
        .with_outputs(&["resource_id", "name", "endpoint", "primary_access_key"]),
    ]
}

fn monitoring() -> Vec<CatalogEntry> {
    vec![
        res(
            "log_analytics_workspace",
            "Azure/avm-res-operationalinsights-workspace/azurerm",
            "0.5.0",
            Category::Monitoring,
            "Deploy Azure Log Analytics Workspace",
        )
        .with_resource_type("Microsoft.OperationalInsights/workspaces")
        .with_aliases(&["log-analytics", "logs", "workspace", "law"])
        .with_outputs(&["resource_id", "name", "workspace_id", "primary_shared_key"])
        .with_default("log_analytics_workspace_sku", "\"PerGB2018\"")
        .with_default("log_analytics_workspace_retention_in_days", "30"),
        res(
            "application_insights",
            "Azure/avm-res-insights-component/azurerm",
            "0.2.0",
            Category::Monitoring,
            "Deploy Azure Application Insights for application monitoring",
        )
        .with_resource_type("Microsoft.Insights/components")
        .with_aliases(&["appinsights", "app-insights", "apm"])
        .with_dependencies(&["log_analytics_workspace"])
        .with_outputs(&["resource_id", "name", "instrumentation_key", "connection_string"]),
    ]
}

fn ai() -> Vec<CatalogEntry> {
    vec![
        res(
            "cognitive_services",
            "Azure/avm-res-cognitiveservices-account/azurerm",
            "0.8.0",
            Category::Ai,
            "Deploy Azure Cognitive Services / Azure AI Services accounts",
        )
        .with_resource_type("Microsoft.CognitiveServices/accounts")
        .with_aliases(&["cognitive", "ai-services", "openai", "azure-openai"])
        .with_outputs(&["resource_id", "name", "endpoint", "primary_access_key"]),
        res(
            "machine_learning",
            "Azure/avm-res-machinelearningservices-workspace/azurerm",
            "0.5.0",
            Category::Ai,
            "Deploy Azure Machine Learning workspaces",
        )
        .with_resource_type("Microsoft.MachineLearningServices/workspaces")
        .with_aliases(&["ml", "aml", "azure-ml"])
        .with_dependencies(&["storage_account", "key_vault", "application_insights"])
        .with_outputs(&["resource_id", "name", "workspace_id"]),
        res(
            "search_service",
            "Azure/avm-res-search-searchservice/azurerm",
            "0.3.0",
            Category::Ai,
            "Deploy Azure AI Search (formerly Cognitive Search)",
        )
        .with_resource_type("Microsoft.Search/searchServices")
        .with_aliases(&["search", "cognitive-search", "ai-search"])
        .with_outputs(&["resource_id", "name", "query_keys", "primary_key"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_category_is_populated() {
        let entries = builtin_entries();
        for cat in Category::ALL {
            assert!(entries.iter().any(|e| e.category == cat), "no entries for {cat}");
        }
    }

    #[test]
    fn test_aliases_do_not_shadow_other_names() {
        let entries = builtin_entries();
        let names: HashSet<String> = entries
            .iter()
            .map(|e| super::super::normalize_identifier(&e.name))
            .collect();
        for entry in &entries {
            for alias in &entry.aliases {
                let key = super::super::normalize_identifier(alias);
                assert!(
                    !names.contains(&key) || key == super::super::normalize_identifier(&entry.name),
                    "alias {alias} of {} shadows a canonical name",
                    entry.name
                );
            }
        }
    }
}
