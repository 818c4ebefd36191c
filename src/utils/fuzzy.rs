// Fuzzy matching utilities for stage code suggestions

/// Calculate Levenshtein distance between two strings
/// Returns the minimum number of single-character edits (insertions, deletions, substitutions)
/// needed to transform one string into another
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let s1_len = s1_chars.len();
    let s2_len = s2_chars.len();

    // Handle empty strings
    if s1_len == 0 {
        return s2_len;
    }
    if s2_len == 0 {
        return s1_len;
    }

    // Create matrix
    let mut matrix = vec![vec![0; s2_len + 1]; s1_len + 1];

    // Initialize first row and column
    for i in 0..=s1_len {
        matrix[i][0] = i;
    }
    for j in 0..=s2_len {
        matrix[0][j] = j;
    }

    // Fill matrix
    for i in 1..=s1_len {
        for j in 1..=s2_len {
            let cost = if s1_chars[i - 1] == s2_chars[j - 1] {
                0
            } else {
                1
            };

            matrix[i][j] = (matrix[i - 1][j] + 1)                    // deletion
                .min(matrix[i][j - 1] + 1)                          // insertion
                .min(matrix[i - 1][j - 1] + cost);                  // substitution
        }
    }

    matrix[s1_len][s2_len]
}

/// Find near matches for a lookup code among known candidates.
/// Returns up to 3 matches sorted by distance (closest first). Prefix
/// matches count as near even when the edit distance is large.
pub fn find_near_matches(
    search: &str,
    candidates: &[String],
    max_distance: usize,
) -> Vec<(String, usize)> {
    let search_lower = search.to_lowercase();
    let mut matches: Vec<(String, usize)> = Vec::new();

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();

        let distance = levenshtein_distance(&search_lower, &candidate_lower);
        if distance <= max_distance {
            matches.push((candidate.clone(), distance));
        } else if search_lower.len() < candidate_lower.len()
            && candidate_lower.starts_with(&search_lower)
        {
            // Prefix match: distance = number of extra characters
            let prefix_distance = candidate_lower.len() - search_lower.len();
            if prefix_distance <= max_distance + 2 {
                matches.push((candidate.clone(), prefix_distance.min(max_distance)));
            }
        }
    }

    // Sort by distance, then by name
    matches.sort_by(|a, b| {
        a.1.cmp(&b.1)
            .then_with(|| a.0.cmp(&b.0))
    });

    matches.into_iter().take(3).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("same", "same"), 0);
        assert_eq!(levenshtein_distance("abc", "def"), 3);
    }

    #[test]
    fn test_find_near_matches() {
        let codes = vec![
            "bienvenida".to_string(),
            "precio_asesorias".to_string(),
            "presentacion_cursos".to_string(),
        ];

        // Typo within distance
        let matches = find_near_matches("bienvenidas", &codes, 2);
        assert_eq!(matches[0].0, "bienvenida");

        // Prefix match
        let matches = find_near_matches("precio", &codes, 2);
        assert!(matches.iter().any(|(c, _)| c == "precio_asesorias"));

        // Nothing close
        let matches = find_near_matches("zzzzz", &codes, 2);
        assert!(matches.is_empty());
    }
}
