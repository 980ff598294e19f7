// src/report/catalog.rs
//
// Built-in catalog of the PIF-relevant sections found in UNFCCC country
// reports. Each definition carries heading regexes (for raw-text matching),
// normalized aliases (for outline matching), and a description used when
// extraction is delegated to the completion API.

use regex::Regex;

use crate::report::SectionSpec;

struct SectionDefinition {
    name: &'static str,
    bundle: &'static str,
    directory: &'static str,
    aliases: &'static [&'static str],
    headings: &'static [&'static str],
    description: &'static str,
}

const DEFINITIONS: &[SectionDefinition] = &[
    SectionDefinition {
        name: "Institutional framework for climate action",
        bundle: "Institutional_framework_bundle.json",
        directory: "Institutional_framework_for_climate_action",
        aliases: &[
            "institutional framework for climate action",
            "institutional framework",
            "institutional arrangements",
            "institutional setup",
        ],
        headings: &[
            r"(?im)^\s*[ivxlcdm]+\.\s*Institutional\s+framework[^\n]*",
            r"(?im)^\s*Institutional\s+framework[^\n]*",
            r"(?im)^\s*Institutional\s+arrangements[^\n]*",
        ],
        description: "Institutional framework for climate action: ministries, \
            agencies, coordination bodies and committees responsible for climate \
            policy, their mandates, and how responsibilities for mitigation, \
            adaptation and reporting are assigned across institutions.",
    },
    SectionDefinition {
        name: "National policy framework",
        bundle: "National_policy_framework_bundle.json",
        directory: "National_policy_framework",
        aliases: &[
            "national policy framework",
            "national strategic framework",
            "policy and regulatory framework",
        ],
        headings: &[
            r"(?im)^\s*[ivxlcdm]+\.\s*National\s+(?:policy|strategic)\s+framework[^\n]*",
            r"(?im)^\s*National\s+(?:policy|strategic)\s+framework[^\n]*",
            r"(?im)^\s*Policy\s+and\s+regulatory\s+framework[^\n]*",
        ],
        description: "National policy framework: national climate strategies, \
            laws, decrees, plans and regulations, their objectives and time \
            horizons, and how they relate to the country's NDC and long-term \
            climate goals.",
    },
    SectionDefinition {
        name: "GHG Inventory Module",
        bundle: "GHG_inventory_bundle.json",
        directory: "GHG_inventory_module",
        aliases: &[
            "ghg inventory module",
            "national greenhouse gas inventory",
            "national ghg inventory",
            "greenhouse gas emissions",
        ],
        headings: &[
            r"(?im)^\s*[ivxlcdm]+\.\s*National\s+greenhouse\s+gas\s+inventory[^\n]*",
            r"(?im)^\s*National\s+greenhouse\s+gas\s+inventory[^\n]*",
            r"(?im)^\s*National\s+GHG\s+inventory[^\n]*",
            r"(?im)^\s*Greenhouse\s+gas\s+emissions[^\n]*",
        ],
        description: "GHG Inventory Module: national greenhouse gas inventory \
            arrangements, methodologies (IPCC guidelines), sectors and gases \
            covered, emission trends, data collection systems, and inventory \
            improvement plans.",
    },
    SectionDefinition {
        name: "Adaptation and Vulnerability Module",
        bundle: "Adaptation_vulnerability_bundle.json",
        directory: "Adaptation_and_vulnerability_module",
        aliases: &[
            "adaptation and vulnerability module",
            "vulnerability and adaptation",
            "climate change impacts and adaptation",
            "adaptation actions",
        ],
        headings: &[
            r"(?im)^\s*[ivxlcdm]+\.\s*Vulnerability\s+and\s+adaptation[^\n]*",
            r"(?im)^\s*Vulnerability\s+and\s+adaptation[^\n]*",
            r"(?im)^\s*Climate\s+change\s+impacts\s+and\s+adaptation[^\n]*",
            r"(?im)^\s*Adaptation\s+actions[^\n]*",
        ],
        description: "Adaptation and Vulnerability Module: climate change \
            impacts, vulnerability assessments, priority sectors at risk, \
            adaptation plans and actions, and monitoring of adaptation progress.",
    },
    SectionDefinition {
        name: "Climate Transparency",
        bundle: "Climate_transparency_bundle.json",
        directory: "Climate_transparency",
        aliases: &[
            "climate transparency",
            "progress in the four modules of the enhanced transparency framework",
        ],
        headings: &[
            r"(?im)^\s*Climate\s+transparency\s+in\s+[^\n]*",
            r"(?im)^\s*Climate\s+transparency[^\n]*",
            r"(?im)^\s*Progress\s+in\s+the\s+four\s+modules\s+of\s+the\s+Enhanced\s+Transparency\s+Framework[^\n]*",
        ],
        description: "Climate Transparency: status and progress of the \
            transparency framework, Enhanced Transparency Framework (ETF) \
            progress, transparency initiatives, reporting capabilities, and \
            challenges related to climate transparency in the country.",
    },
    SectionDefinition {
        name: "Official Reporting to UNFCCC",
        bundle: "Official_reporting_UNFCCC_bundle.json",
        directory: "Official_reporting_UNFCCC",
        aliases: &[
            "official reports to the unfccc",
            "official reporting to the unfccc",
            "reports submitted to the unfccc",
        ],
        headings: &[
            r"(?im)^\s*Official\s+reports?\s+to\s+the\s+UNFCCC[^\n]*",
            r"(?im)^\s*Official\s+reporting\s+to\s+the\s+UNFCCC[^\n]*",
            r"(?im)^\s*Reports\s+submitted\s+to\s+the\s+UNFCCC[^\n]*",
            r"(?im)^\s*Table\s*\d+\.?\s*Official\s+reports\s+to\s+the\s+UNFCCC[^\n]*",
        ],
        description: "Official Reporting to UNFCCC: reports submitted to the \
            UNFCCC (NCs, BURs, BTRs), recommendations and observations from \
            National Communications, Biennial Update Reports and Biennial \
            Transparency Reports, International Consultation and Analysis (ICA) \
            findings, Technical Expert Reviews, and capacity gaps identified in \
            reporting.",
    },
    SectionDefinition {
        name: "Key Barriers",
        bundle: "Key_barriers_bundle.json",
        directory: "Key_barriers",
        aliases: &[
            "key barriers",
            "main barriers",
            "constraints and gaps",
            "constraints gaps and needs",
            "challenges and gaps",
            "barriers to enhanced transparency",
        ],
        headings: &[
            r"(?im)^\s*Key\s+barriers[^\n]*",
            r"(?im)^\s*Main\s+barriers[^\n]*",
            r"(?im)^\s*Constraints\s+and\s+gaps[^\n]*",
            r"(?im)^\s*Constraints,\s+gaps\s+and\s+needs[^\n]*",
            r"(?im)^\s*Challenges\s+and\s+gaps[^\n]*",
            r"(?im)^\s*Barriers\s+to\s+enhanced\s+transparency[^\n]*",
        ],
        description: "Key Barriers: barriers preventing full Enhanced \
            Transparency Framework (ETF) compliance, including lack of \
            systematic climate-data organization and institutional protocols, \
            incomplete ETF modules, and dependence on project-based financing \
            and external consultants for reporting. Include constraints, gaps, \
            challenges, and needs.",
    },
];

/// Builds the built-in section specs, in catalog order. When a country is
/// given, "Climate Transparency" gains a country-specific heading pattern
/// and alias ahead of the generic ones ("Climate transparency in Cuba").
pub fn builtin_specs(country: Option<&str>) -> Vec<SectionSpec> {
    DEFINITIONS
        .iter()
        .map(|def| {
            let mut aliases: Vec<String> = def.aliases.iter().map(|a| a.to_string()).collect();
            let mut heading_patterns: Vec<Regex> = Vec::new();

            if def.name == "Climate Transparency" {
                if let Some(country) = country {
                    let escaped = regex::escape(country);
                    let pattern =
                        format!(r"(?im)^\s*Climate\s+transparency\s+in\s+{}[^\n]*", escaped);
                    if let Ok(re) = Regex::new(&pattern) {
                        heading_patterns.push(re);
                    }
                    aliases.insert(0, format!("climate transparency in {}", country.to_lowercase()));
                }
            }

            heading_patterns.extend(
                def.headings
                    .iter()
                    .filter_map(|pat| Regex::new(pat).ok()), // Skip patterns that fail to compile
            );

            SectionSpec {
                name: def.name.to_string(),
                aliases,
                heading_patterns,
                level: None,
                description: def.description.to_string(),
                bundle: def.bundle.to_string(),
                directory: def.directory.to_string(),
            }
        })
        .collect()
}

/// Filters the catalog down to the requested section names
/// (case-insensitive). Unknown names are logged and skipped.
pub fn select_specs(specs: Vec<SectionSpec>, requested: &[String]) -> Vec<SectionSpec> {
    if requested.is_empty() {
        return specs;
    }
    let wanted: Vec<String> = requested.iter().map(|s| s.trim().to_lowercase()).collect();
    for name in &wanted {
        if !specs.iter().any(|s| s.name.to_lowercase() == *name) {
            tracing::warn!("Requested section '{}' is not in the catalog, skipping", name);
        }
    }
    specs
        .into_iter()
        .filter(|s| wanted.contains(&s.name.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_contains_all_sections() {
        let specs = builtin_specs(None);
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 7);
        assert!(names.contains(&"Institutional framework for climate action"));
        assert!(names.contains(&"GHG Inventory Module"));
        assert!(names.contains(&"Key Barriers"));
    }

    #[test]
    fn test_all_heading_patterns_compile() {
        for spec in builtin_specs(Some("Cuba")) {
            assert!(
                !spec.heading_patterns.is_empty(),
                "Spec '{}' has no usable heading patterns",
                spec.name
            );
            assert!(!spec.aliases.is_empty());
            assert!(!spec.description.is_empty());
        }
    }

    #[test]
    fn test_country_specific_transparency_pattern() {
        let specs = builtin_specs(Some("Dominican Republic"));
        let transparency = specs
            .iter()
            .find(|s| s.name == "Climate Transparency")
            .unwrap();
        assert_eq!(
            transparency.aliases[0],
            "climate transparency in dominican republic"
        );
        assert!(transparency.heading_patterns[0]
            .is_match("Climate transparency in Dominican Republic\n"));
    }

    #[test]
    fn test_select_specs_filters_case_insensitive() {
        let specs = builtin_specs(None);
        let selected = select_specs(specs, &["ghg inventory module".to_string()]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "GHG Inventory Module");
    }

    #[test]
    fn test_select_specs_empty_request_keeps_all() {
        let specs = builtin_specs(None);
        let selected = select_specs(specs, &[]);
        assert_eq!(selected.len(), 7);
    }
}
