use crate::core::projection::grid_mappings;
use crate::io::{Dimension, GriddedDataset};
use crate::types::{Attributes, DataKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub name: String,
    pub shape: Vec<usize>,
    pub dimensions: Vec<String>,
    pub kind: DataKind,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSection {
    pub variable: String,
    pub attributes: Attributes,
}

/// Structured listing of a dataset for display by the host shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataReport {
    pub global_attributes: Attributes,
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<VariableSummary>,
    /// One entry per candidate grid-mapping variable present
    pub projections: Vec<ProjectionSection>,
}

impl MetadataReport {
    pub fn from_dataset(dataset: &dyn GriddedDataset) -> Self {
        let variables = dataset
            .variable_names()
            .iter()
            .filter_map(|name| dataset.variable(name))
            .map(|info| VariableSummary {
                name: info.name,
                shape: info.shape,
                dimensions: info.dimensions,
                kind: info.kind,
                attributes: info.attributes,
            })
            .collect();

        let projections = grid_mappings(dataset)
            .into_iter()
            .map(|mapping| ProjectionSection {
                variable: mapping.variable,
                attributes: mapping.attributes,
            })
            .collect();

        Self {
            global_attributes: dataset.global_attributes(),
            dimensions: dataset.dimensions(),
            variables,
            projections,
        }
    }

    /// (name, shape) pairs for a variable picker
    pub fn variable_listing(&self) -> Vec<(String, Vec<usize>)> {
        self.variables
            .iter()
            .map(|v| (v.name.clone(), v.shape.clone()))
            .collect()
    }
}

fn tuple_of<T: fmt::Display>(items: &[T], quote: bool) -> String {
    let parts: Vec<String> = items
        .iter()
        .map(|item| if quote { format!("'{}'", item) } else { item.to_string() })
        .collect();
    if parts.len() == 1 {
        format!("({},)", parts[0])
    } else {
        format!("({})", parts.join(", "))
    }
}

impl fmt::Display for MetadataReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Global Attributes ===")?;
        for (name, value) in self.global_attributes.iter() {
            writeln!(f, "{}: {}", name, value)?;
        }
        writeln!(f)?;

        writeln!(f, "=== Dimensions ===")?;
        for dim in &self.dimensions {
            writeln!(f, "{}: {}", dim.name, dim.len)?;
        }
        writeln!(f)?;

        write!(f, "=== Variables ===")?;
        for var in &self.variables {
            writeln!(f)?;
            writeln!(f, "\nVariable: {}", var.name)?;
            writeln!(f, "  Shape: {}", tuple_of(&var.shape, false))?;
            writeln!(f, "  Dimensions: {}", tuple_of(&var.dimensions, true))?;
            write!(f, "  Type: {}", var.kind)?;
            if !var.attributes.is_empty() {
                write!(f, "\n  Attributes:")?;
                for (name, value) in var.attributes.iter() {
                    write!(f, "\n    {}: {}", name, value)?;
                }
            }
        }

        for section in &self.projections {
            write!(f, "\n\n=== Projection Information ({}) ===", section.variable)?;
            for (name, value) in section.attributes.iter() {
                write!(f, "\n{}: {}", name, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryDataset, MemoryVariable};

    fn dataset() -> MemoryDataset {
        MemoryDataset::new("report.nc")
            .with_global_attr("Conventions", "CF-1.8")
            .with_dimension("y", 2)
            .with_dimension("x", 3)
            .with_variable(MemoryVariable::new("x", &["x"]).with_data(vec![0.0, 1.0, 2.0]))
            .unwrap()
            .with_variable(
                MemoryVariable::new("tas", &["y", "x"])
                    .with_data(vec![0.0; 6])
                    .with_attr("units", "K"),
            )
            .unwrap()
            .with_variable(
                MemoryVariable::scalar("crs").with_attr("grid_mapping_name", "latitude_longitude"),
            )
            .unwrap()
    }

    #[test]
    fn test_report_sections() {
        let report = MetadataReport::from_dataset(&dataset());
        let text = report.to_string();

        assert!(text.starts_with("=== Global Attributes ===\nConventions: CF-1.8\n"));
        assert!(text.contains("=== Dimensions ===\ny: 2\nx: 3\n"));
        assert!(text.contains("Variable: x\n  Shape: (3,)\n  Dimensions: ('x',)"));
        assert!(text.contains("Variable: tas\n  Shape: (2, 3)\n  Dimensions: ('y', 'x')\n  Type: float64\n  Attributes:\n    units: K"));
        assert!(text.ends_with("=== Projection Information (crs) ===\ngrid_mapping_name: latitude_longitude"));
    }

    #[test]
    fn test_variable_listing() {
        let report = MetadataReport::from_dataset(&dataset());
        let listing = report.variable_listing();
        assert_eq!(listing[1], ("tas".to_string(), vec![2, 3]));
        assert_eq!(report.projections.len(), 1);
    }
}
