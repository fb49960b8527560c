//! Reader selection from discovery results

use rfidlink_types::ReaderDescriptor;
use tracing::debug;

use crate::error::{Error, Result};

/// Pick the reader to connect to
///
/// - With a name hint: first reader whose name contains the hint
///   (case-insensitive), otherwise [`Error::NotFound`].
/// - Without a hint: a lone reader is taken as-is; among several, the
///   first whose name contains any allow-list entry wins, otherwise
///   [`Error::AmbiguousReader`].
///
/// An empty list is always [`Error::NoReaderFound`].
pub fn select_reader<'a, S: AsRef<str>>(
    readers: &'a [ReaderDescriptor],
    name_hint: Option<&str>,
    allow_list: &[S],
) -> Result<&'a ReaderDescriptor> {
    if readers.is_empty() {
        return Err(Error::NoReaderFound);
    }

    if let Some(hint) = name_hint {
        return readers
            .iter()
            .find(|reader| reader.name_contains(hint))
            .ok_or_else(|| Error::NotFound {
                name: hint.to_string(),
            });
    }

    if let [only] = readers {
        return Ok(only);
    }

    for reader in readers {
        debug!("Found device: {}", reader.name);

        if allow_list
            .iter()
            .any(|known| reader.name_contains(known.as_ref()))
        {
            return Ok(reader);
        }
    }

    Err(Error::AmbiguousReader {
        candidates: readers.iter().map(|r| r.name.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rfidlink_types::Transport;

    use crate::constants::DEFAULT_ALLOW_LIST;

    fn reader(name: &str) -> ReaderDescriptor {
        ReaderDescriptor::new(name, Transport::Bluetooth, format!("bt:{}", name))
    }

    #[test]
    fn test_allow_list_picks_known_reader() {
        let readers = vec![reader("OtherDevice"), reader("RFD40+_A")];
        let selected = select_reader(&readers, None, &["RFD40+"]).unwrap();
        assert_eq!(selected.name, "RFD40+_A");
    }

    #[test]
    fn test_allow_list_ignores_case() {
        let readers = vec![reader("rfd8500161755230d5038"), reader("Headset")];
        let selected = select_reader(&readers, None, DEFAULT_ALLOW_LIST).unwrap();
        assert_eq!(selected.name, "rfd8500161755230d5038");
    }

    #[test]
    fn test_ambiguous_readers() {
        let readers = vec![reader("Headset"), reader("Printer")];
        let result = select_reader(&readers, None, DEFAULT_ALLOW_LIST);
        assert!(matches!(result, Err(Error::AmbiguousReader { ref candidates }) if candidates.len() == 2));
    }

    #[test]
    fn test_empty_discovery() {
        let result = select_reader(&[], Some("RFD40+"), DEFAULT_ALLOW_LIST);
        assert_eq!(result, Err(Error::NoReaderFound));
    }

    #[test]
    fn test_name_hint() {
        let readers = vec![reader("RFD40+_A"), reader("RFD8500_B")];

        let selected = select_reader(&readers, Some("rfd8500"), DEFAULT_ALLOW_LIST).unwrap();
        assert_eq!(selected.name, "RFD8500_B");

        let missing = select_reader(&readers, Some("TC27"), DEFAULT_ALLOW_LIST);
        assert_eq!(missing, Err(Error::NotFound { name: "TC27".into() }));
    }

    proptest! {
        #[test]
        fn prop_single_reader_always_selected(name in "[A-Za-z0-9_+]{1,24}") {
            let readers = vec![reader(&name)];
            let selected = select_reader::<&str>(&readers, None, &[]).unwrap();
            prop_assert_eq!(&selected.name, &name);
        }

        #[test]
        fn prop_allow_listed_reader_wins(
            others in proptest::collection::vec("[a-z]{3,12}", 1..5),
            suffix in "[0-9A-F]{4,10}",
            position in 0usize..5,
        ) {
            let mut readers: Vec<_> = others.iter().map(|n| reader(n)).collect();
            let known = format!("RFD40+_{}", suffix);
            let position = position.min(readers.len());
            readers.insert(position, reader(&known));

            let selected = select_reader(&readers, None, &["RFD40+"]).unwrap();
            prop_assert_eq!(&selected.name, &known);
        }
    }
}
