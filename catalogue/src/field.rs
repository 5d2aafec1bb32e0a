use std::fmt;

/// Metadata names understood by the production system's ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataField {
    TitleDocMain,
    CurrentNo,
    CurrentNoSorting,
    PublicationYear,
    DateOfPublication,
    ViewerSubTheme,
    SingleDigCollection,
    CatalogIdDigital,
    CatalogIdSource,
    PhysPageNumber,
    LogicalPageNumber,
    PathImageFiles,
    PlaceOfPublication,
    PublisherName,
    DocLanguage,
    ShelfmarkSource,
}

impl MetadataField {
    /// The name used in the ruleset and in the METS output.
    pub fn name(&self) -> &'static str {
        match self {
            MetadataField::TitleDocMain => "TitleDocMain",
            MetadataField::CurrentNo => "CurrentNo",
            MetadataField::CurrentNoSorting => "CurrentNoSorting",
            MetadataField::PublicationYear => "PublicationYear",
            MetadataField::DateOfPublication => "DateOfPublication",
            MetadataField::ViewerSubTheme => "ViewerSubTheme",
            MetadataField::SingleDigCollection => "singleDigCollection",
            MetadataField::CatalogIdDigital => "CatalogIDDigital",
            MetadataField::CatalogIdSource => "CatalogIDSource",
            MetadataField::PhysPageNumber => "physPageNumber",
            MetadataField::LogicalPageNumber => "logicalPageNumber",
            MetadataField::PathImageFiles => "pathimagefiles",
            MetadataField::PlaceOfPublication => "PlaceOfPublication",
            MetadataField::PublisherName => "PublisherName",
            MetadataField::DocLanguage => "DocLanguage",
            MetadataField::ShelfmarkSource => "shelfmarksource",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MetadataField; 16] = [
        MetadataField::TitleDocMain,
        MetadataField::CurrentNo,
        MetadataField::CurrentNoSorting,
        MetadataField::PublicationYear,
        MetadataField::DateOfPublication,
        MetadataField::ViewerSubTheme,
        MetadataField::SingleDigCollection,
        MetadataField::CatalogIdDigital,
        MetadataField::CatalogIdSource,
        MetadataField::PhysPageNumber,
        MetadataField::LogicalPageNumber,
        MetadataField::PathImageFiles,
        MetadataField::PlaceOfPublication,
        MetadataField::PublisherName,
        MetadataField::DocLanguage,
        MetadataField::ShelfmarkSource,
    ];

    #[test]
    fn names_are_distinct() {
        let mut names: Vec<&str> = ALL.iter().map(|f| f.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn ruleset_spelling() {
        assert_eq!(MetadataField::CatalogIdDigital.name(), "CatalogIDDigital");
        assert_eq!(MetadataField::SingleDigCollection.to_string(), "singleDigCollection");
        assert_eq!(MetadataField::ShelfmarkSource.name(), "shelfmarksource");
    }
}
