//! JavaScript shims for the optional runtime entry points
//!
//! `api.js` exposes a query API bound to the project config and generated
//! client; `next/graphql-api.js` is a Next.js API route. Both reference the
//! sqlite database file by relative path when the provider is sqlite, so
//! bundlers that trace `path.join` calls ship the file with the build.

use std::path::Path;

use crate::config::{ProjectConfig, Provider};
use crate::error::Result;
use crate::paths::{relative, to_slash};

/// Directory the sqlite embedding is computed from, relative to the root
pub const NEXT_DIR: &str = "node_modules/.keystone/next";

/// Declarations accompanying `api.js`
pub const NODE_API_DTS: &str = "import { KeystoneListsAPI } from '@keystone-6/core/types';
import { KeystoneListsTypeInfo } from './types';

export const query: KeystoneListsAPI<KeystoneListsTypeInfo>;
";

/// Declarations accompanying `next/graphql-api.js`
pub const NEXT_GRAPHQL_API_DTS: &str = "export const config: any;
export default config;
";

/// `path.join` statements pointing at the sqlite file, or `None` for other providers
pub fn sqlite_embedding(config: &ProjectConfig, root: &Path) -> Result<Option<String>> {
    if config.db.provider != Provider::Sqlite {
        return Ok(None);
    }
    let Some(db_file) = config.db.sqlite_file_path(root) else {
        return Ok(None);
    };

    let from_next = to_slash(&relative(&root.join(NEXT_DIR), &db_file));
    let from_root = to_slash(&relative(root, &db_file));

    let mut output = String::new();
    output.push_str("import path from 'path';\n\n");
    output.push_str(&format!("path.join(__dirname, {});\n", serde_json::to_string(&from_next)?));
    output.push_str(&format!("path.join(process.cwd(), {});\n", serde_json::to_string(&from_root)?));
    Ok(Some(output))
}

fn push_embedding(output: &mut String, embedding: Option<String>) {
    if let Some(embedding) = embedding {
        output.push('\n');
        output.push_str(&embedding);
    }
    output.push('\n');
}

/// Contents of `api.js`
pub fn node_api_js(config: &ProjectConfig, root: &Path) -> Result<String> {
    let mut output = String::new();
    output.push_str("import keystoneConfig from '../../keystone';\n");
    output.push_str("import { PrismaClient } from '.prisma/client';\n");
    output.push_str(
        "import { createQueryAPI } from '@keystone-6/core/___internal-do-not-use-will-break-in-patch/node-api';\n",
    );
    push_embedding(&mut output, sqlite_embedding(config, root)?);
    output.push_str("export const query = createQueryAPI(keystoneConfig, PrismaClient);\n");
    Ok(output)
}

/// Contents of `next/graphql-api.js`
pub fn next_graphql_api_js(config: &ProjectConfig, root: &Path) -> Result<String> {
    let mut output = String::new();
    output.push_str("import keystoneConfig from '../../../keystone';\n");
    output.push_str("import { PrismaClient } from '.prisma/client';\n");
    output.push_str(
        "import { nextGraphQLAPIRoute } from '@keystone-6/core/___internal-do-not-use-will-break-in-patch/next-graphql';\n",
    );
    push_embedding(&mut output, sqlite_embedding(config, root)?);
    output.push_str("export const config = {\n");
    output.push_str("  api: {\n");
    output.push_str("    bodyParser: false,\n");
    output.push_str("  },\n");
    output.push_str("};\n\n");
    output.push_str("export default nextGraphQLAPIRoute(keystoneConfig, PrismaClient);\n");
    Ok(output)
}
